use thiserror::Error;

use crate::stats::HierarchyLevel;

#[derive(Error, Debug)]
pub enum RegionScopeError {
    #[error("Data error: {0}")]
    Data(#[from] regionscope_data::DataError),
    #[error("Ranking error: {0}")]
    Ranking(#[from] crate::stats::RankingError),
    #[error("Region not found: {0}")]
    RegionNotFound(String),
    #[error("No {level} statistics for metric '{metric}' of region {region_id}")]
    NoStatistics {
        region_id: String,
        metric: String,
        level: HierarchyLevel,
    },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RegionScopeError>;
