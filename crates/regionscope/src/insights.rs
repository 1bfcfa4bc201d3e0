use regionscope_data::{MetricsProvider, MetricsTable, metric_category, normalize_region_id};
use tracing::{info, instrument};

use crate::{
    error::{RegionScopeError, Result},
    stats::{
        HierarchicalStatistics, HierarchyLevel, MetricExtremes, RankingResult, StatisticsIndex,
        build_hierarchy, extremes, rank, rank_region,
    },
};

/// A loaded metrics table together with its hierarchical statistics.
///
/// Statistics are computed once at construction and are read-only afterwards.
#[derive(Debug, Clone)]
pub struct RegionInsights {
    table: MetricsTable,
    metrics: Vec<String>,
    statistics: StatisticsIndex,
}

impl RegionInsights {
    #[instrument(name = "Load region insights", level = "info", skip_all)]
    pub fn load(provider: &impl MetricsProvider) -> Result<Self> {
        Ok(Self::from_table(provider.load()?))
    }

    pub fn from_table(table: MetricsTable) -> Self {
        let metrics = table.metric_names();
        let statistics = build_hierarchy(table.regions(), &metrics);
        info!(
            regions = table.len(),
            metrics = metrics.len(),
            "Region insights ready"
        );
        Self {
            table,
            metrics,
            statistics,
        }
    }

    pub fn table(&self) -> &MetricsTable {
        &self.table
    }

    /// Every metric name, sorted.
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn statistics(&self) -> &StatisticsIndex {
        &self.statistics
    }

    /// Metrics whose name carries `category` before the `|` separator.
    pub fn metrics_in_category(&self, category: &str) -> Vec<&str> {
        self.metrics
            .iter()
            .filter(|m| metric_category(m).is_some_and(|c| c.eq_ignore_ascii_case(category)))
            .map(String::as_str)
            .collect()
    }

    pub fn statistics_for(&self, region_id: &str, metric: &str) -> Option<&HierarchicalStatistics> {
        self.statistics
            .get(&normalize_region_id(region_id), metric)
    }

    /// Ranks one region's value of `metric` within its group at `level`.
    pub fn rank(
        &self,
        region_id: &str,
        metric: &str,
        level: HierarchyLevel,
    ) -> Result<RankingResult> {
        let region = self
            .table
            .get(region_id)
            .ok_or_else(|| RegionScopeError::RegionNotFound(region_id.to_string()))?;
        let no_statistics = || RegionScopeError::NoStatistics {
            region_id: region.region_id.clone(),
            metric: metric.to_string(),
            level,
        };
        let value = region.value(metric).ok_or_else(no_statistics)?;
        let group = self
            .statistics
            .get(&region.region_id, metric)
            .and_then(|bundle| bundle.at(level))
            .ok_or_else(no_statistics)?;
        Ok(rank(metric, value, group)?)
    }

    /// Rankings of every metric the region has, at `level`.
    pub fn rank_region(&self, region_id: &str, level: HierarchyLevel) -> Vec<RankingResult> {
        rank_region(&self.table, &self.statistics, region_id, &self.metrics, level)
    }

    pub fn extremes(&self, metric: &str, n: usize) -> MetricExtremes {
        extremes(&self.table, metric, n)
    }
}
