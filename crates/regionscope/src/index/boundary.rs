use regionscope_data::{BoundaryKind, RawRecord};
use tracing::{debug, info, instrument};

use super::{IndexDefinition, SearchEntry, schema::SchemaAdapter};
use crate::geometry;

/// Index definition for administrative and statistical boundaries (everything but facilities).
#[derive(Debug, Clone, Copy)]
pub struct BoundaryIndexDef {
    kind: BoundaryKind,
    adapter: Option<SchemaAdapter>,
}

impl BoundaryIndexDef {
    pub fn new(kind: BoundaryKind) -> Self {
        Self {
            kind,
            adapter: SchemaAdapter::for_kind(kind),
        }
    }

    fn entry(&self, adapter: &SchemaAdapter, index: usize, record: &RawRecord) -> Option<SearchEntry> {
        let fields = adapter.extract(record);
        if !fields.is_identifiable() {
            debug!(kind = %self.kind, index, "Dropping record without name or code");
            return None;
        }
        let Some(resolved) = record.geometry.as_ref().and_then(geometry::resolve) else {
            debug!(kind = %self.kind, index, "Dropping record with unresolvable geometry");
            return None;
        };
        Some(SearchEntry::new(
            self.kind,
            index,
            fields,
            resolved.centroid,
            resolved.bounds,
        ))
    }
}

impl IndexDefinition for BoundaryIndexDef {
    fn kind(&self) -> BoundaryKind {
        self.kind
    }

    #[instrument(name = "Build boundary index", skip_all, fields(kind = %self.kind), level = "debug")]
    fn build(&self, records: &[RawRecord]) -> Vec<SearchEntry> {
        let Some(adapter) = &self.adapter else {
            return Vec::new();
        };
        let entries: Vec<_> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| self.entry(adapter, index, record))
            .collect();
        info!(
            kind = %self.kind,
            records = records.len(),
            entries = entries.len(),
            "Built boundary index"
        );
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn record(geometry: Value, props: Value) -> RawRecord {
        RawRecord::new(geometry, props.as_object().cloned().unwrap_or_default())
    }

    fn square(lng: f64, lat: f64) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[lng, lat], [lng + 0.1, lat], [lng + 0.1, lat + 0.1], [lng, lat + 0.1], [lng, lat]]]
        })
    }

    #[test]
    fn test_builds_entries_with_stable_ids() {
        let records = vec![
            record(
                square(151.2, -33.9),
                json!({"sa2_name_2021": "Sydney (North) - Millers Point", "sa2_code_2021": "117031645", "state_name_2021": "New South Wales"}),
            ),
            record(square(149.1, -35.3), json!({"SA2_NAME21": "Acton"})),
        ];
        let def = BoundaryIndexDef::new(BoundaryKind::Sa2);
        let first = def.build(&records);
        let second = def.build(&records);

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(first[0].id, "Sydney_(North)_-_Millers_Point_SA2_117031645");
        assert_eq!(first[1].id, "Acton_SA2_1");
        assert_eq!(first[1].state, None);
        for entry in &first {
            let (bounds, centroid) = (entry.bounds.unwrap(), entry.centroid.unwrap());
            assert!(bounds.contains(centroid));
        }
    }

    #[test]
    fn test_drops_unresolvable_records() {
        let records = vec![
            record(json!({"type": "Polygon", "coordinates": null}), json!({"lga_name_2021": "Nowhere"})),
            record(square(145.0, -37.8), json!({"unrelated": "value"})),
            RawRecord {
                geometry: None,
                properties: json!({"lga_name_2021": "No Geometry"}).as_object().cloned().unwrap(),
            },
            record(square(145.0, -37.8), json!({"lga_name_2021": "Melbourne", "lga_code_2021": "24600"})),
        ];
        let entries = BoundaryIndexDef::new(BoundaryKind::Lga).build(&records);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Melbourne");
        assert_eq!(entries[0].kind, BoundaryKind::Lga);
    }

    #[test]
    fn test_facility_kind_builds_nothing_here() {
        let records = vec![record(square(145.0, -37.8), json!({"Service_Name": "X"}))];
        assert!(BoundaryIndexDef::new(BoundaryKind::Facility).build(&records).is_empty());
    }
}
