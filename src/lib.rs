// Library exports for csvchart

pub mod aggregate;
pub mod config;
pub mod data;
pub mod error;
pub mod flash;
pub mod graph;
pub mod palette;
pub mod render;
pub mod server;
pub mod upload;
pub mod views;

pub use error::{Error, Result};

use palette::ColorPalette;

/// Size and colours of rendered charts.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub palette: ColorPalette,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
            palette: ColorPalette::default(),
        }
    }
}
