use regionscope_data::{BoundaryKind, RawRecord};
use tracing::{debug, info, instrument};

use super::{ExtractedFields, FacilityCategory, FacilityInfo, IndexDefinition, SearchEntry};
use crate::geometry::{self, Bounds, LngLat};

/// `(min_lng, min_lat, max_lng, max_lat)` of mainland Australia and Tasmania.
pub const AUSTRALIA_BOUNDS: (f64, f64, f64, f64) = (112.0, -44.0, 154.0, -9.0);

const SERVICE_NAME: &str = "Service_Name";
const ADDRESS: &str = "Physical_Address";
const CARE_TYPE: &str = "Care_Type";
const STATE: &str = "Physical_State";

enum Needles {
    CaseSensitive(&'static [&'static str]),
    CaseInsensitive(&'static [&'static str]),
}

impl Needles {
    fn found_in(&self, haystack: &str) -> bool {
        match self {
            Self::CaseSensitive(needles) => needles.iter().any(|n| haystack.contains(n)),
            Self::CaseInsensitive(needles) => {
                let haystack = haystack.to_lowercase();
                needles
                    .iter()
                    .any(|n| haystack.contains(&n.to_lowercase()))
            }
        }
    }
}

/// Evaluated top to bottom; the first category whose needles occur wins.
const TAXONOMY: [(FacilityCategory, Needles); 4] = [
    (
        FacilityCategory::Residential,
        Needles::CaseSensitive(&["Residential"]),
    ),
    (
        FacilityCategory::MultipurposeOrOther,
        Needles::CaseSensitive(&["Multi-Purpose Service"]),
    ),
    (
        FacilityCategory::Home,
        Needles::CaseSensitive(&["Home Care", "Community Care"]),
    ),
    (
        FacilityCategory::Retirement,
        Needles::CaseInsensitive(&["Retirement", "Retirement Living", "Retirement Village"]),
    ),
];

/// Category of a free-text care type, or `None` when no taxonomy matches.
pub fn classify_care_type(care_type: &str) -> Option<FacilityCategory> {
    TAXONOMY
        .iter()
        .find(|(_, needles)| needles.found_in(care_type))
        .map(|(category, _)| *category)
}

fn within_australia(point: LngLat) -> bool {
    let (min_lng, min_lat, max_lng, max_lat) = AUSTRALIA_BOUNDS;
    (min_lng..=max_lng).contains(&point.lng) && (min_lat..=max_lat).contains(&point.lat)
}

/// Index definition for point-of-interest care facilities.
#[derive(Debug, Clone, Copy)]
pub struct FacilityIndexDef {
    padding: f64,
}

impl FacilityIndexDef {
    /// `padding` is the half-width, in degrees, of the box placed around each point.
    pub fn new(padding: f64) -> Self {
        Self {
            padding: padding.abs(),
        }
    }

    fn entry(&self, index: usize, record: &RawRecord) -> Option<SearchEntry> {
        let Some(point) = record.geometry.as_ref().and_then(geometry::point) else {
            debug!(index, "Dropping facility without a point geometry");
            return None;
        };
        if !within_australia(point) {
            debug!(index, lng = point.lng, lat = point.lat, "Dropping facility outside Australia");
            return None;
        }
        let Some(name) = record.text(SERVICE_NAME) else {
            debug!(index, "Dropping facility without a service name");
            return None;
        };
        let care_type = record.text(CARE_TYPE).unwrap_or_default();
        let Some(category) = classify_care_type(&care_type) else {
            debug!(index, care_type = %care_type, "Dropping unclassifiable facility");
            return None;
        };
        let bounds = Bounds::around(point, self.padding)?;

        let fields = ExtractedFields {
            name: Some(name),
            code: None,
            state: record.text(STATE),
        };
        let entry = SearchEntry::new(BoundaryKind::Facility, index, fields, point, bounds)
            .with_facility(FacilityInfo {
                category,
                address: record.text(ADDRESS),
                care_type,
            });
        Some(entry)
    }
}

impl IndexDefinition for FacilityIndexDef {
    fn kind(&self) -> BoundaryKind {
        BoundaryKind::Facility
    }

    #[instrument(name = "Build facility index", skip_all, level = "debug")]
    fn build(&self, records: &[RawRecord]) -> Vec<SearchEntry> {
        let entries: Vec<_> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| self.entry(index, record))
            .collect();
        info!(
            records = records.len(),
            entries = entries.len(),
            "Built facility index"
        );
        entries
    }
}
