//! RegionScope - Regional Search and Hierarchical Ranking Engine
//!
//! RegionScope turns Australian boundary datasets (LGA, SA2, SA3, SA4, postcode,
//! locality) and care-facility points into a single fuzzy-searchable index, and turns a
//! table of per-region metrics into national, state, SA4 and SA3 statistics that any
//! region can be ranked against.
//!
//! # Quick Start
//!
//! ```rust
//! use regionscope::{HierarchyLevel, RegionInsights, RegionSearcher, SearchConfig};
//! use regionscope::data::{BoundaryKind, InMemoryBoundaries, MetricsTable, RawRecord, RegionMetrics};
//! use serde_json::json;
//!
//! let sa2: RawRecord = serde_json::from_value(json!({
//!     "geometry": {"type": "Polygon", "coordinates": [[[149.0, -35.5], [149.2, -35.5], [149.2, -35.3], [149.0, -35.5]]]},
//!     "properties": {"sa2_name_2021": "Braidwood", "sa2_code_2021": "101021007"}
//! }))?;
//! let searcher = RegionSearcher::new(
//!     InMemoryBoundaries::new().with(BoundaryKind::Sa2, vec![sa2]),
//!     SearchConfig::default(),
//! );
//! let hit = searcher.location_by_name("braidwod").expect("fuzzy match");
//! assert_eq!(hit.code.as_deref(), Some("101021007"));
//!
//! let insights = RegionInsights::from_table(MetricsTable::new([
//!     RegionMetrics::new("101021007").with_value("Demographics | Persons", 4330.0),
//!     RegionMetrics::new("101021008").with_value("Demographics | Persons", 8120.0),
//! ]));
//! let ranking = insights.rank("101021007", "Demographics | Persons", HierarchyLevel::National)?;
//! assert_eq!(ranking.percentile, 0.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Data
//!
//! Boundary files are read from the data directory (`REGIONSCOPE_DATA_DIR`, default
//! `./regionscope_data`) by [`data::GeoJsonDirectory`]; any other source can be plugged in
//! through [`data::BoundaryProvider`] and [`data::MetricsProvider`].
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod config;
pub mod error;
pub mod geometry;
pub mod index;
mod insights;
pub mod proximity;
pub mod search;
pub mod stats;

pub use config::{BoostsBuilder, EXACT_MATCH_SCORE, ScoreBoosts, SearchConfig, SearchConfigBuilder};
pub use geometry::{Bounds, LngLat, ResolvedGeometry};
pub use index::{FacilityCategory, FacilityInfo, IndexCache, SearchEntry};
pub use insights::RegionInsights;
pub use regionscope_data as data;
pub use search::{RegionSearcher, ResultsCache, ScoredEntry};
pub use stats::{
    GroupStatistics, HierarchicalStatistics, HierarchyLevel, PercentileBand, RankingError,
    RankingResult, StatisticsIndex,
};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for RegionScope.
///
/// `RUST_LOG` takes precedence over `level`. Only the first call installs a subscriber;
/// later calls return immediately.
///
/// ```rust
/// use regionscope::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), regionscope::error::RegionScopeError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::RegionScopeError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("rayon=warn".parse()?)
            .add_directive("hyper_util=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}
