//! Error types for loading, aggregating and charting uploaded CSV files.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur between reading an upload and returning its chart.
#[derive(Debug, Error)]
pub enum Error {
    /// The uploaded file is not on disk (never uploaded, or removed).
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but the CSV parser rejected it.
    #[error("failed to parse CSV {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A requested column is not one of the table headers.
    #[error("column '{column}' not found")]
    ColumnNotFound { column: String },

    /// The selected column(s) hold no non-missing values, so there is nothing to draw.
    #[error("column '{column}' has no values to plot")]
    EmptyAggregation { column: String },

    #[error("failed to render chart: {0:#}")]
    Render(#[source] anyhow::Error),

    /// Malformed multipart body or a failed upload write.
    #[error("upload failed: {0}")]
    Upload(String),

    /// A blocking worker panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the failure was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. }
                | Error::Parse { .. }
                | Error::ColumnNotFound { .. }
                | Error::EmptyAggregation { .. }
                | Error::Upload(_)
        )
    }
}
