//! Great-circle nearest-neighbour resolution over entry centroids.

use std::cmp::Ordering;

use crate::{geometry::LngLat, index::SearchEntry};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometres.
pub fn haversine_km(a: LngLat, b: LngLat) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// The `k` candidates closest to `target`, nearest first, with their distances.
///
/// Candidates without a centroid are skipped. Equal distances keep candidate order.
pub fn nearest(target: LngLat, candidates: &[SearchEntry], k: usize) -> Vec<(SearchEntry, f64)> {
    let mut ranked: Vec<(&SearchEntry, f64)> = candidates
        .iter()
        .filter_map(|entry| entry.centroid.map(|c| (entry, haversine_km(target, c))))
        .collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    ranked
        .into_iter()
        .take(k)
        .map(|(entry, km)| (entry.clone(), km))
        .collect()
}
