//! Normalised search entries and the builders that produce them.
//!
//! Each boundary kind has an [`IndexDefinition`] that turns the provider's raw records
//! into [`SearchEntry`] values. Records that cannot be resolved are dropped with a
//! diagnostic; building never fails. Built indices are memoised in an [`IndexCache`].

mod boundary;
mod cache;
mod facility;
mod schema;

use std::fmt;

use regionscope_data::{BoundaryKind, RawRecord};
use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, LngLat};

pub use boundary::BoundaryIndexDef;
pub use cache::IndexCache;
pub use facility::{AUSTRALIA_BOUNDS, FacilityIndexDef, classify_care_type};
pub use schema::{ExtractedFields, SchemaAdapter};

/// Facility taxonomy, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityCategory {
    Residential,
    MultipurposeOrOther,
    Home,
    Retirement,
}

impl FacilityCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Residential => "residential",
            Self::MultipurposeOrOther => "multipurpose_or_other",
            Self::Home => "home",
            Self::Retirement => "retirement",
        }
    }
}

impl fmt::Display for FacilityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facility-only attributes carried by an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityInfo {
    pub category: FacilityCategory,
    pub address: Option<String>,
    pub care_type: String,
}

/// One searchable unit. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEntry {
    /// `{name with spaces as underscores}_{KIND}_{code or source index}`
    pub id: String,
    pub name: String,
    pub code: Option<String>,
    pub area_label: String,
    pub kind: BoundaryKind,
    pub state: Option<String>,
    pub centroid: Option<LngLat>,
    pub bounds: Option<Bounds>,
    pub facility: Option<FacilityInfo>,
}

impl SearchEntry {
    pub(crate) fn new(
        kind: BoundaryKind,
        index: usize,
        fields: ExtractedFields,
        centroid: LngLat,
        bounds: Bounds,
    ) -> Self {
        let ExtractedFields { name, code, state } = fields;
        let name = name.or_else(|| code.clone()).unwrap_or_default();
        let id = entry_id(&name, kind, code.as_deref(), index);
        let area_label = match &state {
            Some(state) => format!("{name}, {state}"),
            None => name.clone(),
        };
        Self {
            id,
            name,
            code,
            area_label,
            kind,
            state,
            centroid: Some(centroid),
            bounds: Some(bounds),
            facility: None,
        }
    }

    pub(crate) fn with_facility(mut self, facility: FacilityInfo) -> Self {
        self.facility = Some(facility);
        self
    }

    pub fn facility_category(&self) -> Option<FacilityCategory> {
        self.facility.as_ref().map(|f| f.category)
    }

    /// `"{name} ({code})"` when the code adds information, else the name.
    pub fn display_label(&self) -> String {
        match &self.code {
            Some(code) if *code != self.name => format!("{} ({code})", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Stable id; derived only from source data, so rebuilding yields the same ids.
pub fn entry_id(name: &str, kind: BoundaryKind, code: Option<&str>, index: usize) -> String {
    let name = name.replace(' ', "_");
    match code {
        Some(code) => format!("{name}_{}_{code}", kind.label()),
        None => format!("{name}_{}_{index}", kind.label()),
    }
}

/// How to build the entries of one boundary kind.
pub trait IndexDefinition: fmt::Debug + Send + Sync {
    fn kind(&self) -> BoundaryKind;

    /// Converts raw records into entries, dropping records that cannot be resolved.
    fn build(&self, records: &[RawRecord]) -> Vec<SearchEntry>;
}

/// The definition used for `kind`: facility points get their own builder.
pub fn definition_for(kind: BoundaryKind, facility_padding: f64) -> Box<dyn IndexDefinition> {
    if kind.is_facility() {
        Box::new(FacilityIndexDef::new(facility_padding))
    } else {
        Box::new(BoundaryIndexDef::new(kind))
    }
}
