use std::fmt;

use ahash::AHashMap as HashMap;
use rayon::prelude::*;
use regionscope_data::RegionMetrics;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{GroupStatistics, aggregate};

/// Comparison group a region is ranked within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyLevel {
    National,
    State,
    Sa4,
    Sa3,
}

impl HierarchyLevel {
    pub const ALL: [Self; 4] = [Self::National, Self::State, Self::Sa4, Self::Sa3];

    /// Group code of `region` at this level; every region belongs to the national group.
    pub fn group_code(self, region: &RegionMetrics) -> Option<&str> {
        match self {
            Self::National => Some(""),
            Self::State => region.state_code.as_deref(),
            Self::Sa4 => region.sa4_code.as_deref(),
            Self::Sa3 => region.sa3_code.as_deref(),
        }
    }
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::National => "national",
            Self::State => "state",
            Self::Sa4 => "sa4",
            Self::Sa3 => "sa3",
        })
    }
}

/// Statistics of one metric for one region at every hierarchy level.
///
/// A level is `None` only when the region has no code for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalStatistics {
    pub national: GroupStatistics,
    pub state: Option<GroupStatistics>,
    pub sa4: Option<GroupStatistics>,
    pub sa3: Option<GroupStatistics>,
}

impl HierarchicalStatistics {
    pub fn at(&self, level: HierarchyLevel) -> Option<&GroupStatistics> {
        match level {
            HierarchyLevel::National => Some(&self.national),
            HierarchyLevel::State => self.state.as_ref(),
            HierarchyLevel::Sa4 => self.sa4.as_ref(),
            HierarchyLevel::Sa3 => self.sa3.as_ref(),
        }
    }
}

type GroupKey = (HierarchyLevel, String, String);

/// Output of [`build_hierarchy`]: per-(region, metric) bundles plus every group summary.
#[derive(Debug, Clone, Default)]
pub struct StatisticsIndex {
    by_region: HashMap<(String, String), HierarchicalStatistics>,
    groups: HashMap<GroupKey, GroupStatistics>,
}

impl StatisticsIndex {
    pub fn get(&self, region_id: &str, metric: &str) -> Option<&HierarchicalStatistics> {
        self.by_region
            .get(&(region_id.to_string(), metric.to_string()))
    }

    /// Summary of one group; the national group has the empty code.
    pub fn group(
        &self,
        level: HierarchyLevel,
        code: &str,
        metric: &str,
    ) -> Option<&GroupStatistics> {
        self.groups
            .get(&(level, code.to_string(), metric.to_string()))
    }

    /// Every `(code, statistics)` at `level` for `metric`.
    pub fn groups_at<'a>(
        &'a self,
        level: HierarchyLevel,
        metric: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a GroupStatistics)> + 'a {
        self.groups
            .iter()
            .filter(move |((l, _, m), _)| *l == level && m == metric)
            .map(|((_, code, _), stats)| (code.as_str(), stats))
    }

    pub fn len(&self) -> usize {
        self.by_region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_region.is_empty()
    }
}

/// Partition of the regions by group code at one level.
fn partition(
    regions: &[RegionMetrics],
    level: HierarchyLevel,
) -> HashMap<&str, Vec<&RegionMetrics>> {
    let mut groups: HashMap<&str, Vec<&RegionMetrics>> = HashMap::new();
    for region in regions {
        if let Some(code) = level.group_code(region) {
            groups.entry(code).or_default().push(region);
        }
    }
    groups
}

/// Group summaries and per-region bundles for a single metric.
fn build_metric<'r>(
    regions: &'r [RegionMetrics],
    partitions: &[(HierarchyLevel, HashMap<&'r str, Vec<&'r RegionMetrics>>)],
    metric: &str,
) -> StatisticsIndex {
    let mut index = StatisticsIndex::default();
    // One aggregation per (level, code); regions sharing a group reuse it.
    let mut memo: HashMap<(HierarchyLevel, &'r str), GroupStatistics> = HashMap::new();
    for (level, groups) in partitions {
        for (code, members) in groups {
            let stats = aggregate(members.iter().copied(), metric);
            memo.insert((*level, *code), stats);
            index
                .groups
                .insert((*level, (*code).to_string(), metric.to_string()), stats);
        }
    }

    let at = |level: HierarchyLevel, region: &'r RegionMetrics| {
        level
            .group_code(region)
            .and_then(|code| memo.get(&(level, code)).copied())
    };
    for region in regions {
        let Some(national) = at(HierarchyLevel::National, region) else {
            continue;
        };
        let bundle = HierarchicalStatistics {
            national,
            state: at(HierarchyLevel::State, region),
            sa4: at(HierarchyLevel::Sa4, region),
            sa3: at(HierarchyLevel::Sa3, region),
        };
        index
            .by_region
            .insert((region.region_id.clone(), metric.to_string()), bundle);
    }
    index
}

/// National, state, SA4 and SA3 statistics of every metric for every region.
///
/// Metrics are processed in parallel; each one touches only its own entries.
#[instrument(name = "Build hierarchy", level = "info", skip_all, fields(regions = regions.len(), metrics = metrics.len()))]
pub fn build_hierarchy(regions: &[RegionMetrics], metrics: &[String]) -> StatisticsIndex {
    let partitions: Vec<_> = HierarchyLevel::ALL
        .into_iter()
        .map(|level| (level, partition(regions, level)))
        .collect();

    let index = metrics
        .par_iter()
        .map(|metric| build_metric(regions, &partitions, metric))
        .reduce(StatisticsIndex::default, |mut acc, part| {
            acc.by_region.extend(part.by_region);
            acc.groups.extend(part.groups);
            acc
        });

    info!(
        bundles = index.by_region.len(),
        groups = index.groups.len(),
        "Hierarchy statistics built"
    );
    index
}
