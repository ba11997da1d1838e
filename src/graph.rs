use crate::palette::ColorPalette;
use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::prelude::*;

/// Style configuration for bar layers
#[derive(Debug, Clone)]
pub struct BarStyle {
    pub color: RGBColor,
    /// Fraction of a category slot covered by the bar.
    pub width: f64,
}

impl Default for BarStyle {
    fn default() -> Self {
        Self {
            color: ColorPalette::default().primary(),
            width: 0.8,
        }
    }
}

/// Title and axis descriptions of a chart
#[derive(Debug, Clone, Default)]
pub struct ChartLabels {
    pub title: String,
    pub x: String,
    pub y: String,
}

/// Offscreen canvas for categorical bar charts.
///
/// Owns its RGB buffer; every drawing call builds a fresh backend over it, so
/// nothing outlives the canvas.
pub struct Canvas {
    buffer: Vec<u8>,
    width: u32,
    height: u32,
    labels: ChartLabels,
    chart_initialized: bool,
}

impl Canvas {
    pub fn new(width: u32, height: u32, labels: ChartLabels) -> Result<Self> {
        if width == 0 || height == 0 {
            anyhow::bail!("Canvas dimensions must be positive (got {}x{})", width, height);
        }

        let buffer = vec![0u8; width as usize * height as usize * 3];

        Ok(Canvas {
            buffer,
            width,
            height,
            labels,
            chart_initialized: false,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Draw one bar per category.
    pub fn draw_bars(&mut self, categories: &[String], values: &[f64], style: &BarStyle) -> Result<()> {
        if categories.len() != values.len() {
            anyhow::bail!(
                "Categories and values must have the same length (categories: {}, values: {})",
                categories.len(),
                values.len()
            );
        }

        if categories.is_empty() {
            anyhow::bail!("Cannot create bar chart with no data");
        }

        let y_max = values.iter().cloned().fold(0.0, f64::max);

        let root = BitMapBackend::with_buffer(&mut self.buffer, (self.width, self.height))
            .into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(self.labels.title.as_str(), ("sans-serif", 20))
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(category_range(categories.len()), count_range(y_max))
            .context("Failed to build chart")?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(categories.len())
            .x_label_formatter(&|x| category_label(categories, *x))
            .y_label_formatter(&|y| count_label(*y))
            .x_desc(self.labels.x.as_str())
            .y_desc(self.labels.y.as_str())
            .draw()
            .context("Failed to draw mesh")?;

        let color = style.color;
        let half_width = style.width / 2.0;

        chart
            .draw_series(values.iter().enumerate().map(|(cat_idx, &y_val)| {
                let x_center = cat_idx as f64;
                Rectangle::new(
                    [(x_center - half_width, 0.0), (x_center + half_width, y_val)],
                    color.filled(),
                )
            }))
            .context("Failed to draw bars")?;

        root.present().context("Failed to present drawing")?;
        self.chart_initialized = true;

        Ok(())
    }

    /// Draw one stacked bar per category, one coloured segment per series.
    ///
    /// `series` holds `(name, values)` with `values` indexed like `categories`;
    /// zero-valued segments are skipped.
    pub fn draw_stacked_bars(
        &mut self,
        categories: &[String],
        series: &[(String, Vec<f64>)],
        palette: &ColorPalette,
    ) -> Result<()> {
        if categories.is_empty() {
            anyhow::bail!("Cannot create bar chart with no categories");
        }

        if series.is_empty() {
            anyhow::bail!("Cannot create bar chart with no series");
        }

        if let Some((name, values)) = series.iter().find(|(_, v)| v.len() != categories.len()) {
            anyhow::bail!(
                "Series '{}' has {} values but there are {} categories",
                name,
                values.len(),
                categories.len()
            );
        }

        let stack_max = (0..categories.len())
            .map(|cat_idx| series.iter().map(|(_, v)| v[cat_idx]).sum::<f64>())
            .fold(0.0, f64::max);

        let root = BitMapBackend::with_buffer(&mut self.buffer, (self.width, self.height))
            .into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(self.labels.title.as_str(), ("sans-serif", 20))
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(category_range(categories.len()), count_range(stack_max))
            .context("Failed to build chart")?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(categories.len())
            .x_label_formatter(&|x| category_label(categories, *x))
            .y_label_formatter(&|y| count_label(*y))
            .x_desc(self.labels.x.as_str())
            .y_desc(self.labels.y.as_str())
            .draw()
            .context("Failed to draw mesh")?;

        let half_width = BarStyle::default().width / 2.0;
        let mut y_cumulative = vec![0.0; categories.len()];

        for (series_idx, (name, values)) in series.iter().enumerate() {
            let color = palette.color(series_idx);

            let mut segments = Vec::new();
            for (cat_idx, &y_val) in values.iter().enumerate() {
                if y_val <= 0.0 {
                    continue;
                }
                let x_center = cat_idx as f64;
                let y_start = y_cumulative[cat_idx];
                segments.push(Rectangle::new(
                    [
                        (x_center - half_width, y_start),
                        (x_center + half_width, y_start + y_val),
                    ],
                    color.filled(),
                ));
                y_cumulative[cat_idx] += y_val;
            }

            chart
                .draw_series(segments)
                .context("Failed to draw bar segment")?
                .label(name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .context("Failed to draw legend")?;

        root.present().context("Failed to present drawing")?;
        self.chart_initialized = true;

        Ok(())
    }

    /// Finalize and encode the canvas as PNG
    pub fn render(self) -> Result<Vec<u8>> {
        if !self.chart_initialized {
            anyhow::bail!("Nothing has been drawn on the canvas");
        }

        let mut png_bytes = Vec::new();
        {
            let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
            encoder
                .write_image(
                    &self.buffer,
                    self.width,
                    self.height,
                    image::ColorType::Rgb8,
                )
                .context("Failed to encode PNG")?;
        }

        Ok(png_bytes)
    }
}

/// Category `i` is centred on `x = i`.
fn category_range(num_categories: usize) -> std::ops::Range<f64> {
    -0.5..(num_categories as f64 - 0.5)
}

/// Counts start at zero with 5% headroom above the tallest bar.
fn count_range(max: f64) -> std::ops::Range<f64> {
    0.0..(max * 1.05).max(1.0)
}

fn category_label(categories: &[String], x: f64) -> String {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() > 1e-6 {
        return String::new();
    }
    categories
        .get(idx as usize)
        .map(|c| truncate_label(c, 16))
        .unwrap_or_default()
}

fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let mut s: String = label.chars().take(max_chars - 1).collect();
        s.push('…');
        s
    }
}

fn count_label(y: f64) -> String {
    if y.fract() == 0.0 {
        format!("{:.0}", y)
    } else {
        format!("{:.1}", y)
    }
}
