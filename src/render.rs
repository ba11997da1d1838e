// Turns aggregation results into encoded bar charts

use crate::aggregate::{CrossTab, ValueCounts};
use crate::error::{Error, Result};
use crate::graph::{self, BarStyle, ChartLabels};
use crate::RenderOptions;
use base64::Engine;

/// A rendered PNG chart.
#[derive(Debug, Clone)]
pub struct ChartImage {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl ChartImage {
    /// Standard base64 of the PNG bytes, ready for a `data:image/png;base64,` URL.
    pub fn to_base64(&self) -> String {
        base64::prelude::BASE64_STANDARD.encode(&self.png)
    }
}

/// Simple bar chart: one bar per distinct value of the column.
pub fn render_value_counts(counts: &ValueCounts, options: &RenderOptions) -> Result<ChartImage> {
    if counts.is_empty() {
        return Err(Error::EmptyAggregation {
            column: counts.column.clone(),
        });
    }

    let labels = ChartLabels {
        title: format!("Distribution of {}", counts.column),
        x: counts.column.clone(),
        y: "Count".to_string(),
    };

    let (categories, values): (Vec<String>, Vec<f64>) = counts
        .entries
        .iter()
        .map(|(value, n)| (value.clone(), *n as f64))
        .unzip();

    let style = BarStyle {
        color: options.palette.primary(),
        ..BarStyle::default()
    };

    draw(options, labels, |canvas| canvas.draw_bars(&categories, &values, &style))
}

/// Stacked bar chart: one bar per group value, one segment per series value.
pub fn render_crosstab(crosstab: &CrossTab, options: &RenderOptions) -> Result<ChartImage> {
    if crosstab.is_empty() {
        return Err(Error::EmptyAggregation {
            column: crosstab.group_column.clone(),
        });
    }

    let labels = ChartLabels {
        title: format!(
            "Distribution based on {} and {}",
            crosstab.group_column, crosstab.series_column
        ),
        x: crosstab.group_column.clone(),
        y: "Count".to_string(),
    };

    let series = crosstab.grid();

    draw(options, labels, |canvas| {
        canvas.draw_stacked_bars(&crosstab.groups, &series, &options.palette)
    })
}

fn draw<F>(options: &RenderOptions, labels: ChartLabels, paint: F) -> Result<ChartImage>
where
    F: FnOnce(&mut graph::Canvas) -> anyhow::Result<()>,
{
    let title = labels.title.clone();
    let mut canvas =
        graph::Canvas::new(options.width, options.height, labels).map_err(Error::Render)?;
    paint(&mut canvas).map_err(Error::Render)?;
    let (width, height) = canvas.dimensions();
    let png = canvas.render().map_err(Error::Render)?;

    tracing::debug!(%title, width, height, bytes = png.len(), "rendered chart");

    Ok(ChartImage {
        title,
        width,
        height,
        png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{cross_tabulate, value_counts};
    use crate::data::Table;
    use base64::prelude::BASE64_STANDARD;

    const PNG_MAGIC: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

    fn make_table() -> Table {
        Table::from_reader("A,B\nx,p\nx,p\ny,q\n".as_bytes()).unwrap()
    }

    fn small_options() -> RenderOptions {
        RenderOptions {
            width: 320,
            height: 240,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_value_counts_chart_round_trips_through_base64() {
        let counts = value_counts(&make_table(), "A").unwrap();
        let chart = render_value_counts(&counts, &small_options()).unwrap();
        assert_eq!(chart.title, "Distribution of A");

        let decoded = BASE64_STANDARD.decode(chart.to_base64()).unwrap();
        assert_eq!(decoded, chart.png);
        assert_eq!(decoded[0..8], PNG_MAGIC);
    }

    #[test]
    fn test_crosstab_chart_title_and_png() {
        let tab = cross_tabulate(&make_table(), "A", "B").unwrap();
        let chart = render_crosstab(&tab, &small_options()).unwrap();
        assert_eq!(chart.title, "Distribution based on B and A");
        assert_eq!(chart.png[0..8], PNG_MAGIC);

        let img = image::load_from_memory(&chart.png).unwrap();
        assert_eq!((img.width(), img.height()), (320, 240));
    }

    #[test]
    fn test_empty_aggregation_is_an_error() {
        let table = Table::from_reader("A,B\n,\n".as_bytes()).unwrap();
        let counts = value_counts(&table, "A").unwrap();
        assert!(matches!(
            render_value_counts(&counts, &small_options()),
            Err(Error::EmptyAggregation { .. })
        ));

        let tab = cross_tabulate(&table, "A", "B").unwrap();
        assert!(matches!(
            render_crosstab(&tab, &small_options()),
            Err(Error::EmptyAggregation { .. })
        ));
    }

    #[test]
    fn test_zero_size_is_a_render_error() {
        let counts = value_counts(&make_table(), "A").unwrap();
        let options = RenderOptions {
            width: 0,
            ..RenderOptions::default()
        };
        assert!(matches!(
            render_value_counts(&counts, &options),
            Err(Error::Render(_))
        ));
    }

    #[test]
    fn test_repeated_renders_are_consistent() {
        let tab = cross_tabulate(&make_table(), "A", "B").unwrap();
        let options = small_options();
        let first = render_crosstab(&tab, &options).unwrap();

        for _ in 0..50 {
            let again = render_crosstab(&tab, &options).unwrap();
            assert_eq!((again.width, again.height), (first.width, first.height));
            assert_eq!(again.png, first.png);
        }
    }
}
