use std::cmp::Ordering;

use regionscope_data::MetricsTable;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{GroupStatistics, HierarchyLevel, RankingError, StatisticsIndex};

/// Where one value sits within a group's statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingResult {
    pub metric_name: String,
    pub current_value: f64,
    pub statistics: GroupStatistics,
    /// Estimated from the percentile, not an exact order statistic.
    pub rank: u32,
    /// 0 to 100, linear between the group's minimum and maximum.
    pub percentile: f64,
    pub total_regions: u32,
}

/// Ranks `value` of `metric` against `stats`.
///
/// Percentile is linear in `[min, max]` and fixed at 50 when the range is empty.
/// Rank is `max(1, round((100 - percentile) * count / 100) + 1)`.
pub fn rank(
    metric: &str,
    value: f64,
    stats: &GroupStatistics,
) -> Result<RankingResult, RankingError> {
    if stats.is_empty() {
        return Err(RankingError::EmptyStatistics {
            metric: metric.to_string(),
        });
    }
    if !value.is_finite() {
        return Err(RankingError::NonFiniteValue {
            metric: metric.to_string(),
            value,
        });
    }

    let range = stats.max - stats.min;
    let percentile = if range == 0.0 {
        50.0
    } else {
        ((value - stats.min) / range * 100.0).clamp(0.0, 100.0)
    };
    let estimated = ((100.0 - percentile) * stats.count as f64 / 100.0).round() + 1.0;

    Ok(RankingResult {
        metric_name: metric.to_string(),
        current_value: value,
        statistics: *stats,
        rank: estimated.max(1.0) as u32,
        percentile,
        total_regions: stats.count as u32,
    })
}

/// One ranking per metric the region has a value for and that has statistics at `level`.
#[instrument(name = "Rank region", level = "debug", skip(table, stats, metrics))]
pub fn rank_region(
    table: &MetricsTable,
    stats: &StatisticsIndex,
    region_id: &str,
    metrics: &[String],
    level: HierarchyLevel,
) -> Vec<RankingResult> {
    let Some(region) = table.get(region_id) else {
        debug!("Unknown region");
        return Vec::new();
    };
    metrics
        .iter()
        .filter_map(|metric| {
            let value = region.value(metric)?;
            let group = stats.get(&region.region_id, metric)?.at(level)?;
            rank(metric, value, group).ok()
        })
        .collect()
}

/// Quartile band of a percentile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentileBand {
    Top25,
    AboveMedian,
    BelowMedian,
    Bottom25,
}

pub fn percentile_band(percentile: f64) -> PercentileBand {
    match percentile {
        p if p >= 75.0 => PercentileBand::Top25,
        p if p >= 50.0 => PercentileBand::AboveMedian,
        p if p >= 25.0 => PercentileBand::BelowMedian,
        _ => PercentileBand::Bottom25,
    }
}

/// Headline figures over a set of rankings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingSummary {
    pub mean_percentile: f64,
    /// Percentile of 75 or more
    pub top_quartile: usize,
    /// Percentile of 25 or less
    pub bottom_quartile: usize,
}

impl RankingSummary {
    pub fn from_results(results: &[RankingResult]) -> Self {
        if results.is_empty() {
            return Self::default();
        }
        let total: f64 = results.iter().map(|r| r.percentile).sum();
        Self {
            mean_percentile: total / results.len() as f64,
            top_quartile: results.iter().filter(|r| r.percentile >= 75.0).count(),
            bottom_quartile: results.iter().filter(|r| r.percentile <= 25.0).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRegion {
    pub region_id: String,
    pub region_name: String,
    pub value: f64,
}

/// Highest and lowest named regions for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricExtremes {
    pub metric: String,
    /// Descending by value
    pub top: Vec<RankedRegion>,
    /// Ascending by value
    pub bottom: Vec<RankedRegion>,
    pub total: usize,
}

/// Top and bottom `n` regions by `metric`. Regions without a name or a finite value are
/// left out; equal values are ordered by region id.
pub fn extremes(table: &MetricsTable, metric: &str, n: usize) -> MetricExtremes {
    let mut ranked: Vec<RankedRegion> = table
        .iter()
        .filter_map(|region| {
            let value = region.value(metric).filter(|v| v.is_finite())?;
            Some(RankedRegion {
                region_id: region.region_id.clone(),
                region_name: region.region_name.clone()?,
                value,
            })
        })
        .collect();
    let by_value = |a: &RankedRegion, b: &RankedRegion| {
        a.value
            .partial_cmp(&b.value)
            .unwrap_or(Ordering::Equal)
    };
    let total = ranked.len();

    ranked.sort_by(|a, b| by_value(b, a).then_with(|| a.region_id.cmp(&b.region_id)));
    let top = ranked.iter().take(n).cloned().collect();
    ranked.sort_by(|a, b| by_value(a, b).then_with(|| a.region_id.cmp(&b.region_id)));
    let bottom = ranked.into_iter().take(n).collect();

    MetricExtremes {
        metric: metric.to_string(),
        top,
        bottom,
        total,
    }
}
