// Mercuriales Dashboard - Library errors
// Binaries and config loading wrap these in anyhow; the dashboard matches on them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// Transport failure or undecodable body from the data service
    #[error("request to data service failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Data service answered with a non-success status
    #[error("data service returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// Fetch task went away before delivering a result
    #[error("data fetch ended without a result")]
    FetchAborted,

    /// Export requested while the filtered selection is empty
    #[error("nothing to export")]
    NothingToExport,

    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid record data: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
