//! Integration tests for RegionScope
//!
//! These run against the public API only: boundary records go in through a provider,
//! searches and rankings come out. Files are written to temporary directories so the
//! tests never depend on a populated data directory.

use std::{fs, path::Path};

use regionscope::{
    HierarchyLevel, LngLat, RegionInsights, RegionSearcher, SearchConfig, SearchConfigBuilder,
    data::{
        BoundaryKind, GeoJsonDirectory, InMemoryBoundaries, LongFormat, LongMetricsFiles,
        MetricsTable, RawRecord, RegionHierarchy, RegionMetrics,
    },
    geometry, proximity,
    search::edit_distance,
    stats::{GroupStatistics, rank},
};
use serde_json::{Value, json};

fn setup_test_env() {
    let _ = regionscope::init_logging(tracing::Level::WARN);
}

fn square(lng: f64, lat: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[lng, lat], [lng + 0.1, lat], [lng + 0.1, lat + 0.1], [lng, lat + 0.1], [lng, lat]]]
    })
}

fn record(geometry: Value, properties: Value) -> RawRecord {
    serde_json::from_value(json!({"geometry": geometry, "properties": properties})).unwrap()
}

fn sydney_provider() -> InMemoryBoundaries {
    InMemoryBoundaries::new()
        .with(
            BoundaryKind::Sa2,
            vec![record(
                square(151.15, -33.9),
                json!({"sa2_name_2021": "Sydney", "sa2_code_2021": "117031645", "state_name_2021": "New South Wales"}),
            )],
        )
        .with(
            BoundaryKind::Locality,
            vec![record(
                json!({"type": "Point", "coordinates": [151.21, -33.87]}),
                json!({"SAL_NAME21": "Sydney CBD", "SAL_CODE21": "SAL13665", "STE_NAME21": "New South Wales"}),
            )],
        )
}

#[test]
fn test_end_to_end_search() {
    setup_test_env();

    let searcher = RegionSearcher::new(sydney_provider(), SearchConfig::default());

    // Both are prefix matches; the locality carries its text boost.
    let hits = searcher.search_scored("syd", 10);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].entry.name, "Sydney CBD");
    assert_eq!(hits[0].score, 95);
    assert_eq!(hits[1].entry.name, "Sydney");
    assert_eq!(hits[1].score, 80);

    // The exact match outranks the boosted prefix match.
    let hits = searcher.search_scored("Sydney", 10);
    assert_eq!(hits[0].entry.name, "Sydney");
    assert_eq!(hits[0].score, 100);
    assert_eq!(hits[1].score, 95);
}

#[test]
fn test_equal_scores_prefer_localities() {
    setup_test_env();

    let config = SearchConfigBuilder::new().boosts().disable().done().build();
    let searcher = RegionSearcher::new(sydney_provider(), config);

    let hits = searcher.search_scored("syd", 10);
    assert_eq!(hits[0].score, hits[1].score);
    assert_eq!(hits[0].entry.kind, BoundaryKind::Locality);
    assert_eq!(hits[1].entry.kind, BoundaryKind::Sa2);
}

#[test]
fn test_search_reads_geojson_directory() {
    setup_test_env();

    let dir = tempfile::tempdir().unwrap();
    write_collection(
        dir.path(),
        BoundaryKind::Postcode,
        &[json!({"type": "Feature", "geometry": square(149.2, -35.4), "properties": {"POA_CODE21": "2620"}})],
    );
    write_collection(
        dir.path(),
        BoundaryKind::Locality,
        &[
            json!({"type": "Feature", "geometry": square(149.2, -35.4), "properties": {"SAL_NAME21": "Queanbeyan", "SAL_CODE21": "SAL12620"}}),
            json!({"type": "Feature", "geometry": null, "properties": {"SAL_NAME21": "Nowhere"}}),
        ],
    );

    let searcher = RegionSearcher::new(GeoJsonDirectory::new(dir.path()), SearchConfig::default());

    // Missing files degrade to empty indices; the null geometry is dropped.
    assert_eq!(searcher.index(BoundaryKind::Locality).len(), 1);
    assert!(searcher.index(BoundaryKind::Sa4).is_empty());

    let hits = searcher.search_scored("2620", 5);
    assert_eq!(hits[0].entry.kind, BoundaryKind::Postcode);
    assert_eq!(hits[0].entry.name, "2620");
    assert_eq!(hits[0].score, 120);

    let location = searcher.location_by_name("queanbeyan").unwrap();
    assert_eq!(location.code.as_deref(), Some("SAL12620"));
    let centroid = location.centroid.unwrap();
    assert!(location.bounds.unwrap().contains(centroid));
}

fn write_collection(dir: &Path, kind: BoundaryKind, features: &[Value]) {
    let collection = json!({"type": "FeatureCollection", "features": features});
    fs::write(dir.join(kind.file_name()), collection.to_string()).unwrap();
}

#[test]
fn test_facility_search_and_nearby() {
    setup_test_env();

    let provider = sydney_provider().with(
        BoundaryKind::Facility,
        vec![record(
            json!({"type": "Point", "coordinates": [151.2, -33.88]}),
            json!({
                "Service_Name": "Harbourside Aged Care",
                "Care_Type": "Residential",
                "Physical_Address": "12 George Street",
                "Physical_State": "NSW"
            }),
        )],
    );
    let searcher = RegionSearcher::new(provider, SearchConfig::default());

    let hits = searcher.search_scored("george", 5);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entry.kind, BoundaryKind::Facility);
    assert_eq!(hits[0].score, 50 + 25);

    let nearby = searcher.resolve_nearby("harbourside", BoundaryKind::Locality, 3);
    assert_eq!(nearby.len(), 1);
    assert_eq!(nearby[0].0.name, "Sydney CBD");
    assert!(nearby[0].1 > 0.0 && nearby[0].1 < 5.0);
}

#[test]
fn test_invalidate_rebuilds_index() {
    setup_test_env();

    let searcher = RegionSearcher::new(sydney_provider(), SearchConfig::default());
    assert_eq!(searcher.search("syd", 10).len(), 2);
    assert!(searcher.index_cache().built_kinds().contains(&BoundaryKind::Sa2));

    searcher.invalidate(BoundaryKind::Sa2);
    assert!(!searcher.index_cache().built_kinds().contains(&BoundaryKind::Sa2));
    assert!(searcher.results_cache().is_empty());
    assert_eq!(searcher.search("syd", 10).len(), 2);
}

#[test]
fn test_geometry_properties() {
    let polygon = json!({
        "type": "Polygon",
        "coordinates": [[[150.0, -34.0], [151.5, -34.0], [151.5, -33.0], [150.0, -34.0]]]
    });
    let resolved = geometry::resolve(&polygon).unwrap();
    assert!(resolved.bounds.contains(resolved.centroid));
    assert_eq!(resolved.centroid, LngLat::new(150.75, -33.5));

    assert!(geometry::resolve(&json!({"type": "Polygon", "coordinates": null})).is_none());
}

#[test]
fn test_edit_distance_properties() {
    assert_eq!(edit_distance("sydney", "sydney"), 0);
    assert_eq!(edit_distance("sydney", "sidney"), 1);
    assert_eq!(edit_distance("", "abc"), 3);
}

#[test]
fn test_nearest_returns_self_first() {
    setup_test_env();

    let searcher = RegionSearcher::new(sydney_provider(), SearchConfig::default());
    let sydney = searcher.location_by_name("sydney").unwrap();
    let mut candidates = searcher.index(BoundaryKind::Locality).to_vec();
    candidates.push(sydney.clone());

    let nearest = proximity::nearest(sydney.centroid.unwrap(), &candidates, 2);
    assert_eq!(nearest[0].0.id, sydney.id);
    assert!(nearest[0].1.abs() < 1e-6);
}

#[test]
fn test_percentile_degenerate_case() {
    let stats = GroupStatistics {
        min: 5.0,
        max: 5.0,
        count: 4,
        ..GroupStatistics::default()
    };
    let result = rank("Income | Median", 5.0, &stats).unwrap();
    assert_eq!(result.percentile, 50.0);
}

#[test]
fn test_state_counts_sum_to_attributed_regions() {
    setup_test_env();

    let state = |code: &str| RegionHierarchy {
        state_code: Some(code.to_string()),
        ..RegionHierarchy::default()
    };
    let metric = "Income | Median weekly income";
    let table = MetricsTable::new([
        RegionMetrics::new("101021007").with_hierarchy(state("1")).with_value(metric, 700.0),
        RegionMetrics::new("101021008").with_hierarchy(state("1")).with_value(metric, 900.0),
        RegionMetrics::new("201011001").with_hierarchy(state("2")).with_value(metric, 800.0),
        RegionMetrics::new("201011002").with_hierarchy(state("2")),
        RegionMetrics::new("901011001").with_value(metric, 650.0),
    ]);
    let insights = RegionInsights::from_table(table);

    let total: usize = insights
        .statistics()
        .groups_at(HierarchyLevel::State, metric)
        .map(|(_, stats)| stats.count)
        .sum();
    assert_eq!(total, 3);

    let national = insights.statistics_for("901011001", metric).unwrap();
    assert_eq!(national.national.count, 4);
    assert!(national.state.is_none());
}

#[test]
fn test_metrics_files_feed_rankings() {
    setup_test_env();

    let dir = tempfile::tempdir().unwrap();
    let demographics = dir.path().join("demographics.json");
    fs::write(
        &demographics,
        json!([
            {"SA2 ID": "101021007", "SA2 Name": "Braidwood", "Description": "Median age - persons (years)", "Amount": "52"},
            {"SA2 ID": "101021008", "SA2 Name": "Karabar", "Description": "Median age - persons (years)", "Amount": "36"},
            {"SA2 ID": "101021009", "SA2 Name": "Queanbeyan", "Description": "Median age - persons (years)", "Amount": "40"},
            {"SA2 ID": "101021009", "SA2 Name": "Queanbeyan", "Description": "Persons", "Amount": "11,240"}
        ])
        .to_string(),
    )
    .unwrap();
    let hierarchy = dir.path().join("hierarchy.csv");
    fs::write(
        &hierarchy,
        "SA2_CODE_2021,SA3_CODE_2021,SA4_CODE_2021,STATE_CODE_2021\n\
         101021007,10102,101,1\n\
         101021008,10102,101,1\n\
         101021009,10103,101,1\n",
    )
    .unwrap();

    let insights = RegionInsights::load(
        &LongMetricsFiles::new()
            .source(&demographics, LongFormat::Demographics)
            .hierarchy(&hierarchy),
    )
    .unwrap();
    assert_eq!(insights.table().len(), 3);

    let age = "Demographics | Median age - persons (years)";
    let result = insights.rank("101021009", age, HierarchyLevel::Sa4).unwrap();
    assert_eq!(result.total_regions, 3);
    assert_eq!(result.statistics.median, 40.0);
    // (40 - 36) / (52 - 36) = 25th percentile
    assert_eq!(result.percentile, 25.0);
    assert_eq!(result.rank, 3);

    let persons = insights.table().get("101021009").unwrap().value("Demographics | Persons");
    assert_eq!(persons, Some(11240.0));

    // Queanbeyan is alone in its SA3.
    let sa3 = insights.rank("101021009", age, HierarchyLevel::Sa3).unwrap();
    assert_eq!(sa3.percentile, 50.0);

    let extremes = insights.extremes(age, 1);
    assert_eq!(extremes.top[0].region_name, "Braidwood");
    assert_eq!(extremes.bottom[0].region_name, "Karabar");
}
