//! Boundary kinds and the raw GeoJSON records they are built from.

use std::{fmt, fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::{DataError, Result};

/// Every searchable dataset, from administrative boundaries down to facility points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
    Lga,
    Sa2,
    Sa3,
    Sa4,
    Postcode,
    Locality,
    Facility,
}

impl BoundaryKind {
    /// Merge order used by the search orchestrator.
    pub const ALL: [Self; 7] = [
        Self::Lga,
        Self::Sa2,
        Self::Sa3,
        Self::Sa4,
        Self::Postcode,
        Self::Locality,
        Self::Facility,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lga => "lga",
            Self::Sa2 => "sa2",
            Self::Sa3 => "sa3",
            Self::Sa4 => "sa4",
            Self::Postcode => "postcode",
            Self::Locality => "locality",
            Self::Facility => "facility",
        }
    }

    /// Upper-case tag embedded in entry ids.
    pub fn label(self) -> &'static str {
        match self {
            Self::Lga => "LGA",
            Self::Sa2 => "SA2",
            Self::Sa3 => "SA3",
            Self::Sa4 => "SA4",
            Self::Postcode => "POSTCODE",
            Self::Locality => "LOCALITY",
            Self::Facility => "FACILITY",
        }
    }

    /// File name of the dataset inside the data directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Lga => "LGA.geojson",
            Self::Sa2 => "SA2.geojson",
            Self::Sa3 => "SA3.geojson",
            Self::Sa4 => "SA4.geojson",
            Self::Postcode => "POA.geojson",
            Self::Locality => "SAL.geojson",
            Self::Facility => "healthcare.geojson",
        }
    }

    pub fn is_facility(self) -> bool {
        matches!(self, Self::Facility)
    }
}

impl fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One GeoJSON feature as delivered by a provider: geometry plus an attribute bag.
///
/// Nothing is validated here. A missing or `null` geometry is kept as `None` so the
/// index builders can report it as a data-quality drop instead of failing the whole file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawRecord {
    pub fn new(geometry: Value, properties: Map<String, Value>) -> Self {
        Self {
            geometry: Some(geometry),
            properties,
        }
    }

    /// Attribute value rendered as trimmed text; numbers are stringified, empty strings
    /// and every other JSON type count as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// First non-empty attribute among `keys`, tried in order.
    pub fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.text(key))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<RawRecord>,
}

impl FeatureCollection {
    #[instrument(name = "Read GeoJSON", level = "debug", skip_all)]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::MissingFile(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        let collection: Self = serde_json::from_reader(reader)?;
        info!(
            path = %path.display(),
            features = collection.features.len(),
            "Loaded feature collection"
        );
        Ok(collection)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
