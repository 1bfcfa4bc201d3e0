//! Order statistics over region metrics, their hierarchy, and ranking.
//!
//! [`aggregate`] summarises one metric over a group of regions, [`build_hierarchy`]
//! repeats that for the national, state, SA4 and SA3 groups, and [`rank`] places a
//! single value within one of those summaries.

mod hierarchy;
mod ranking;

use regionscope_data::RegionMetrics;
use serde::{Deserialize, Serialize};

pub use error::RankingError;
pub use hierarchy::{HierarchicalStatistics, HierarchyLevel, StatisticsIndex, build_hierarchy};
pub use ranking::{
    MetricExtremes, PercentileBand, RankedRegion, RankingResult, RankingSummary, extremes,
    percentile_band, rank, rank_region,
};

/// Five-number summary plus mean and count of one metric over one group.
///
/// `count == 0` is the "no data" sentinel with every other field zero; check `count`
/// before trusting the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStatistics {
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub mean: f64,
    pub count: usize,
}

impl GroupStatistics {
    /// The `count == 0` sentinel.
    pub const EMPTY: Self = Self {
        min: 0.0,
        max: 0.0,
        q1: 0.0,
        median: 0.0,
        q3: 0.0,
        mean: 0.0,
        count: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Statistics of a raw sample. NaN values are discarded.
    ///
    /// Quartiles use fixed indices `floor(n/4)`, `floor(n/2)` and `floor(3n/4)` into the
    /// sorted sample. When `n` is a multiple of four, Q1 and Q3 average the element at
    /// their index with the one before it; the median does the same whenever `n` is even.
    /// This is not one of the textbook quartile definitions and is kept as is because
    /// published rankings were computed with it.
    pub fn from_sample(sample: impl IntoIterator<Item = f64>) -> Self {
        let mut sorted: Vec<f64> = sample.into_iter().filter(|v| !v.is_nan()).collect();
        let n = sorted.len();
        if n == 0 {
            return Self::EMPTY;
        }
        let mean = sorted.iter().sum::<f64>() / n as f64;
        sorted.sort_by(f64::total_cmp);

        let q1_idx = n / 4;
        let median_idx = n / 2;
        let q3_idx = n * 3 / 4;
        let midpoint = |i: usize| (sorted[i - 1] + sorted[i]) / 2.0;

        let (q1, q3) = if n % 4 == 0 {
            (midpoint(q1_idx), midpoint(q3_idx))
        } else {
            (sorted[q1_idx], sorted[q3_idx])
        };
        let median = if n % 2 == 0 {
            midpoint(median_idx)
        } else {
            sorted[median_idx]
        };

        Self {
            min: sorted[0],
            max: sorted[n - 1],
            q1,
            median,
            q3,
            mean,
            count: n,
        }
    }
}

/// Statistics of `metric` over `group`; regions without a value for it are ignored.
pub fn aggregate<'a>(
    group: impl IntoIterator<Item = &'a RegionMetrics>,
    metric: &str,
) -> GroupStatistics {
    GroupStatistics::from_sample(group.into_iter().filter_map(|region| region.value(metric)))
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum RankingError {
        #[error("Cannot rank metric '{metric}' against empty statistics")]
        EmptyStatistics { metric: String },
        #[error("Cannot rank non-finite value {value} for metric '{metric}'")]
        NonFiniteValue { metric: String, value: f64 },
    }
}
