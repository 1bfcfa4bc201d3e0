//! Dataset provision for the regionscope engine.
//!
//! This crate owns everything that touches source data: the boundary kinds and
//! their GeoJSON files, raw feature records, providers that hand those records to
//! the index builders, and the wide per-region metrics table consumed by the
//! statistics layer. The engine crate never reads files itself.

use once_cell::sync::Lazy;
use std::path::PathBuf;
use tracing::debug;

pub mod boundary;
pub mod metrics;
pub mod provider;

#[cfg(feature = "download_data")]
pub mod fetch;

pub const DATA_DIR_DEFAULT: &str = "./regionscope_data";
pub const DATA_DIR_ENV: &str = "REGIONSCOPE_DATA_DIR";

/// Directory boundary files and metric exports are read from (and downloaded into).
///
/// Resolution order: the `REGIONSCOPE_DATA_DIR` environment variable, the platform
/// data directory when the `system-dirs` feature is enabled, then `./regionscope_data`.
pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        debug!(dir, "Using data directory from environment");
        return PathBuf::from(dir);
    }

    #[cfg(feature = "system-dirs")]
    if let Some(dirs) = directories::ProjectDirs::from("", "", "regionscope") {
        return dirs.data_dir().to_path_buf();
    }

    PathBuf::from(DATA_DIR_DEFAULT)
});

pub fn get_data_dir() -> &'static std::path::Path {
    DATA_DIR.as_path()
}

mod error {
    use polars::prelude::PolarsError;
    use std::path::PathBuf;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DataError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Polars error: {0}")]
        Polars(#[from] PolarsError),
        #[error("Serialization error: {0}")]
        Serde(#[from] serde_json::Error),
        #[cfg(feature = "download_data")]
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),
        #[cfg(feature = "download_data")]
        #[error("Join error: {0}")]
        JoinError(#[from] tokio::task::JoinError),
        #[cfg(feature = "download_data")]
        #[error("Zip error: {0}")]
        ZipError(#[from] zip::result::ZipError),
        #[error("Dataset file not found: {}", .0.display())]
        MissingFile(PathBuf),
        #[error("Required column '{0}' not found")]
        MissingColumn(String),
        #[error("No dataset registered for {0}")]
        NoDataset(crate::boundary::BoundaryKind),
    }

    pub type Result<T> = std::result::Result<T, DataError>;
}

pub use boundary::{BoundaryKind, FeatureCollection, RawRecord};
pub use error::{DataError, Result};
pub use metrics::{
    LongFormat, LongRow, MetricsTable, RegionHierarchy, RegionMetrics, metric_category,
    normalize_region_id,
};
pub use provider::{
    BoundaryProvider, GeoJsonDirectory, InMemoryBoundaries, LongMetricsFiles, MetricsProvider,
};
