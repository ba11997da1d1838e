use crate::RenderOptions;
use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Server settings. Every flag can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "csvchart")]
#[command(about = "Upload a CSV file and chart the distribution of its columns", long_about = None)]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "CSVCHART_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind to
    #[arg(long, env = "CSVCHART_PORT", default_value = "5000")]
    pub port: u16,

    /// Directory where uploaded files are stored (created if missing)
    #[arg(long, env = "CSVCHART_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Secret used to sign flash-message cookies
    #[arg(long, env = "CSVCHART_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Accepted upload extensions (comma-separated, case-insensitive)
    #[arg(
        long,
        env = "CSVCHART_ALLOWED_EXTENSIONS",
        value_delimiter = ',',
        default_value = "csv"
    )]
    pub allowed_extensions: Vec<String>,

    /// Maximum upload size in megabytes
    #[arg(long, env = "CSVCHART_UPLOAD_LIMIT_MB", default_value = "16")]
    pub upload_limit_mb: usize,

    /// Chart width in pixels
    #[arg(long, default_value = "1000")]
    pub chart_width: u32,

    /// Chart height in pixels
    #[arg(long, default_value = "500")]
    pub chart_height: u32,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.secret_key.trim().is_empty() {
            anyhow::bail!("secret key must not be empty");
        }
        if self.secret_key.len() < 32 {
            tracing::warn!("secret key is shorter than 32 bytes; use a longer random value in production");
        }
        if self.chart_width == 0 || self.chart_height == 0 {
            anyhow::bail!(
                "chart dimensions must be positive (got {}x{})",
                self.chart_width,
                self.chart_height
            );
        }
        if self.allowed_extensions().is_empty() {
            anyhow::bail!("at least one allowed extension is required");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid host or port: {}:{}", self.host, self.port))
    }

    /// Extensions lowercased, without a leading dot.
    pub fn allowed_extensions(&self) -> Vec<String> {
        self.allowed_extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }

    pub fn upload_limit_bytes(&self) -> usize {
        self.upload_limit_mb * 1024 * 1024
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            width: self.chart_width,
            height: self.chart_height,
            ..RenderOptions::default()
        }
    }
}
