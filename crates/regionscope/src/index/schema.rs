//! Per-kind attribute schemas.
//!
//! Boundary files were published under several naming conventions over the years, so
//! every field is an ordered chain of candidate keys; the first non-empty value wins.

use regionscope_data::{BoundaryKind, RawRecord};

type Keys = &'static [&'static str];

const STATE_2021: Keys = &["state_name_2021", "STATE_NAME21"];

/// Fields pulled out of a raw record before geometry resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub code: Option<String>,
    pub state: Option<String>,
}

impl ExtractedFields {
    /// A record is indexable only with a name or a code.
    pub fn is_identifiable(&self) -> bool {
        self.name.is_some() || self.code.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaAdapter {
    pub kind: BoundaryKind,
    name: Keys,
    code: Keys,
    state: Keys,
}

impl SchemaAdapter {
    /// Adapter for an administrative or statistical boundary kind; `None` for facilities.
    pub const fn for_kind(kind: BoundaryKind) -> Option<Self> {
        let (name, code, state): (Keys, Keys, Keys) = match kind {
            BoundaryKind::Lga => (
                &["lga_name_2021", "lga_name_2022", "LGA_NAME21"],
                &["lga_code_2021", "lga_code_2022", "LGA_CODE21"],
                &["state_name_2021", "state_name_2022", "STATE_NAME21"],
            ),
            BoundaryKind::Sa2 => (
                &["sa2_name_2021", "SA2_NAME21"],
                &["sa2_code_2021", "SA2_CODE21"],
                STATE_2021,
            ),
            BoundaryKind::Sa3 => (
                &["sa3_name_2021", "SA3_NAME21"],
                &["sa3_code_2021", "SA3_CODE21"],
                STATE_2021,
            ),
            BoundaryKind::Sa4 => (
                &["sa4_name_2021", "SA4_NAME21"],
                &["sa4_code_2021", "SA4_CODE21"],
                STATE_2021,
            ),
            // Postcodes are named by their code.
            BoundaryKind::Postcode => (
                &[],
                &["poa_code_2021", "POA_CODE21", "poa_name_2021", "POA_NAME21"],
                STATE_2021,
            ),
            BoundaryKind::Locality => (
                &["SAL_NAME21", "SAL_NAME"],
                &["SAL_CODE21", "SAL_CODE"],
                &["STE_NAME21", "STE_NAME", "state_name_2021", "STATE_NAME21"],
            ),
            BoundaryKind::Facility => return None,
        };
        Some(Self {
            kind,
            name,
            code,
            state,
        })
    }

    pub fn extract(&self, record: &RawRecord) -> ExtractedFields {
        let code = record.first_text(self.code);
        let name = if self.name.is_empty() {
            code.clone()
        } else {
            record.first_text(self.name)
        };
        ExtractedFields {
            name,
            code,
            state: record.first_text(self.state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value, json};

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_lga_falls_back_through_variants() {
        let adapter = SchemaAdapter::for_kind(BoundaryKind::Lga).unwrap();
        let record = RawRecord {
            geometry: None,
            properties: props(json!({
                "lga_name_2021": "",
                "lga_name_2022": "Albury",
                "LGA_CODE21": "10050",
                "STATE_NAME21": "New South Wales"
            })),
        };
        let fields = adapter.extract(&record);
        assert_eq!(fields.name.as_deref(), Some("Albury"));
        assert_eq!(fields.code.as_deref(), Some("10050"));
        assert_eq!(fields.state.as_deref(), Some("New South Wales"));
    }

    #[test]
    fn test_postcode_name_is_code() {
        let adapter = SchemaAdapter::for_kind(BoundaryKind::Postcode).unwrap();
        let record = RawRecord {
            geometry: None,
            properties: props(json!({"POA_NAME21": "2600"})),
        };
        let fields = adapter.extract(&record);
        assert_eq!(fields.name.as_deref(), Some("2600"));
        assert_eq!(fields.code.as_deref(), Some("2600"));
        assert!(fields.is_identifiable());
    }

    #[test]
    fn test_locality_state_variants_and_missing_identity() {
        let adapter = SchemaAdapter::for_kind(BoundaryKind::Locality).unwrap();
        let record = RawRecord {
            geometry: None,
            properties: props(json!({"SAL_NAME": "Bondi", "STATE_NAME21": "New South Wales"})),
        };
        let fields = adapter.extract(&record);
        assert_eq!(fields.name.as_deref(), Some("Bondi"));
        assert_eq!(fields.code, None);
        assert_eq!(fields.state.as_deref(), Some("New South Wales"));

        let anonymous = adapter.extract(&RawRecord::default());
        assert!(!anonymous.is_identifiable());
    }

    #[test]
    fn test_no_adapter_for_facilities() {
        assert!(SchemaAdapter::for_kind(BoundaryKind::Facility).is_none());
    }
}
