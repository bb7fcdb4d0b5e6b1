// Mercuriales Dashboard - Core Library
// Filter / table / chart / export pipeline shared by the terminal UI, the CLI and the API server

pub mod error;
pub mod record;
pub mod filter;
pub mod table;
pub mod chart;
pub mod export;
pub mod source;
pub mod config;
pub mod dashboard;

// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use error::{DashboardError, Result};
pub use record::{two_decimals, Record, RecordStore};
pub use filter::{filter, FilterCriteria, Selection, ALL};
pub use table::{render_rows, TableRow, NO_RESULTS};
pub use chart::{
    group_series, random_color, ChartBackend, ChartConfig, ChartSurface, RetainedBackend, Series,
};
pub use export::{encode, write_export, EXPORT_FILENAME, NOTHING_TO_EXPORT};
pub use source::{fetch_records, load_records_file, DEFAULT_ENDPOINT};
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, Phase, Response, UiEvent};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
