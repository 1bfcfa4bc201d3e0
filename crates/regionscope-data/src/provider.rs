//! Providers: where boundary records and metric rows come from.
//!
//! The engine only sees the two traits. Failures are reported per call so that one
//! unavailable boundary file does not stop the others from being indexed.

use std::path::{Path, PathBuf};

use ahash::AHashMap as HashMap;
use tracing::{info, instrument};

use crate::{
    DataError, Result,
    boundary::{BoundaryKind, FeatureCollection, RawRecord},
    metrics::{LongFormat, MetricsTable, read_hierarchy_csv, read_long_csv, read_long_json},
};

/// Supplies raw records per boundary kind.
pub trait BoundaryProvider: Send + Sync {
    fn fetch(&self, kind: BoundaryKind) -> Result<Vec<RawRecord>>;
}

/// Supplies the full metrics table.
pub trait MetricsProvider: Send + Sync {
    fn load(&self) -> Result<MetricsTable>;
}

/// Reads `<root>/<kind file name>` GeoJSON files.
#[derive(Debug, Clone)]
pub struct GeoJsonDirectory {
    root: PathBuf,
}

impl GeoJsonDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Provider rooted at the shared data directory.
    pub fn from_data_dir() -> Self {
        Self::new(crate::get_data_dir())
    }

    pub fn path_for(&self, kind: BoundaryKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BoundaryProvider for GeoJsonDirectory {
    #[instrument(name = "Fetch boundary file", level = "debug", skip(self))]
    fn fetch(&self, kind: BoundaryKind) -> Result<Vec<RawRecord>> {
        Ok(FeatureCollection::from_path(self.path_for(kind))?.features)
    }
}

/// Records held in memory, for embedding callers and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBoundaries {
    records: HashMap<BoundaryKind, Vec<RawRecord>>,
}

impl InMemoryBoundaries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: BoundaryKind, records: Vec<RawRecord>) -> Self {
        self.insert(kind, records);
        self
    }

    pub fn insert(&mut self, kind: BoundaryKind, records: Vec<RawRecord>) {
        self.records.insert(kind, records);
    }
}

impl BoundaryProvider for InMemoryBoundaries {
    fn fetch(&self, kind: BoundaryKind) -> Result<Vec<RawRecord>> {
        self.records
            .get(&kind)
            .cloned()
            .ok_or(DataError::NoDataset(kind))
    }
}

/// A set of long-format exports merged into one table, plus an optional hierarchy file.
#[derive(Debug, Clone, Default)]
pub struct LongMetricsFiles {
    sources: Vec<(PathBuf, LongFormat)>,
    hierarchy: Option<PathBuf>,
}

impl LongMetricsFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an export; `.csv` files are read with polars, anything else as a JSON array.
    pub fn source(mut self, path: impl Into<PathBuf>, format: LongFormat) -> Self {
        self.sources.push((path.into(), format));
        self
    }

    pub fn hierarchy(mut self, path: impl Into<PathBuf>) -> Self {
        self.hierarchy = Some(path.into());
        self
    }
}

impl MetricsProvider for LongMetricsFiles {
    #[instrument(name = "Load metrics table", level = "info", skip_all)]
    fn load(&self) -> Result<MetricsTable> {
        let mut table = MetricsTable::default();
        for (path, format) in &self.sources {
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            let rows = if is_csv {
                read_long_csv(path, *format)?
            } else {
                read_long_json(path, *format)?
            };
            table.extend_long_rows(rows);
        }
        if let Some(path) = &self.hierarchy {
            table.attach_hierarchy(&read_hierarchy_csv(path)?);
        }
        info!(
            regions = table.len(),
            metrics = table.metric_names().len(),
            "Metrics table loaded"
        );
        Ok(table)
    }
}

impl MetricsProvider for MetricsTable {
    fn load(&self) -> Result<MetricsTable> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_geojson_directory_reads_kind_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("SA3.geojson")).unwrap();
        let collection = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {"SA3_NAME21": "Queanbeyan"},
                          "geometry": {"type": "Point", "coordinates": [149.2, -35.3]}}]
        });
        write!(file, "{collection}").unwrap();

        let provider = GeoJsonDirectory::new(dir.path());
        let records = provider.fetch(BoundaryKind::Sa3).unwrap();
        assert_eq!(records.len(), 1);

        let missing = provider.fetch(BoundaryKind::Sa4).unwrap_err();
        assert!(matches!(missing, DataError::MissingFile(_)));
    }

    #[test]
    fn test_in_memory_provider_reports_unregistered_kind() {
        let provider = InMemoryBoundaries::new().with(BoundaryKind::Lga, vec![RawRecord::default()]);
        assert_eq!(provider.fetch(BoundaryKind::Lga).unwrap().len(), 1);
        assert!(matches!(
            provider.fetch(BoundaryKind::Postcode),
            Err(DataError::NoDataset(BoundaryKind::Postcode))
        ));
    }

    #[test]
    fn test_long_metrics_files_merges_sources() {
        let dir = tempfile::tempdir().unwrap();
        let demographics = dir.path().join("Demographics_2023.json");
        std::fs::write(
            &demographics,
            json!([{"SA2 ID": "101021007", "SA2 Name": "Braidwood",
                    "Description": "Persons", "Amount": "4,330"}])
            .to_string(),
        )
        .unwrap();
        let dss = dir.path().join("dss.csv");
        std::fs::write(
            &dss,
            "SA2 ID,SA2 Name,Category,Type,Amount\n101021007,Braidwood,Payments,Age Pension,812\n",
        )
        .unwrap();

        let table = LongMetricsFiles::new()
            .source(&demographics, LongFormat::Demographics)
            .source(&dss, LongFormat::CategoryType)
            .load()
            .unwrap();

        let region = table.get("101021007").unwrap();
        assert_eq!(region.value("Demographics | Persons"), Some(4330.0));
        assert_eq!(region.value("Payments | Age Pension"), Some(812.0));
        assert_eq!(region.region_name.as_deref(), Some("Braidwood"));
    }
}
