//! Centroid and bounding-box extraction from GeoJSON geometries.
//!
//! The centroid is the midpoint of the axis-aligned bounding box, not an area-weighted
//! centroid. Proximity results downstream are computed against this midpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

/// A `(longitude, latitude)` pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }
}

impl From<(f64, f64)> for LngLat {
    fn from((lng, lat): (f64, f64)) -> Self {
        Self { lng, lat }
    }
}

/// Axis-aligned bounding box. Always valid: `min <= max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    min_lng: f64,
    min_lat: f64,
    max_lng: f64,
    max_lat: f64,
}

impl Bounds {
    /// `None` unless every edge is finite and the box is not inverted.
    pub fn new(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Option<Self> {
        let finite = [min_lng, min_lat, max_lng, max_lat]
            .iter()
            .all(|v| v.is_finite());
        (finite && min_lng <= max_lng && min_lat <= max_lat).then_some(Self {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
        })
    }

    /// A square box of half-width `padding` degrees around `point`.
    pub fn around(point: LngLat, padding: f64) -> Option<Self> {
        let padding = padding.abs();
        Self::new(
            point.lng - padding,
            point.lat - padding,
            point.lng + padding,
            point.lat + padding,
        )
    }

    pub fn center(&self) -> LngLat {
        LngLat::new(
            (self.min_lng + self.max_lng) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    pub fn contains(&self, point: LngLat) -> bool {
        (self.min_lng..=self.max_lng).contains(&point.lng)
            && (self.min_lat..=self.max_lat).contains(&point.lat)
    }

    /// `(min_lng, min_lat, max_lng, max_lat)`
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.min_lng, self.min_lat, self.max_lng, self.max_lat)
    }

    pub fn min_lng(&self) -> f64 {
        self.min_lng
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lng(&self) -> f64 {
        self.max_lng
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedGeometry {
    pub centroid: LngLat,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
}

impl GeometryKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "Point" => Some(Self::Point),
            "MultiPoint" => Some(Self::MultiPoint),
            "LineString" => Some(Self::LineString),
            "MultiLineString" => Some(Self::MultiLineString),
            "Polygon" => Some(Self::Polygon),
            "MultiPolygon" => Some(Self::MultiPolygon),
            _ => None,
        }
    }

    /// Kind named by the geometry's `type` member.
    pub fn of(geometry: &Value) -> Option<Self> {
        geometry.get("type")?.as_str().and_then(Self::parse)
    }
}

/// Running min/max over every coordinate pair reached.
struct Extent {
    min_lng: f64,
    min_lat: f64,
    max_lng: f64,
    max_lat: f64,
}

impl Extent {
    fn empty() -> Self {
        Self {
            min_lng: f64::INFINITY,
            min_lat: f64::INFINITY,
            max_lng: f64::NEG_INFINITY,
            max_lat: f64::NEG_INFINITY,
        }
    }

    fn push(&mut self, lng: f64, lat: f64) {
        self.min_lng = self.min_lng.min(lng);
        self.max_lng = self.max_lng.max(lng);
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
    }

    fn walk(&mut self, coords: &Value) {
        let Some(items) = coords.as_array() else {
            return;
        };
        if let Some((lng, lat)) = as_pair(items) {
            self.push(lng, lat);
        } else {
            for item in items {
                self.walk(item);
            }
        }
    }

    fn into_bounds(self) -> Option<Bounds> {
        Bounds::new(self.min_lng, self.min_lat, self.max_lng, self.max_lat)
    }
}

/// A leaf `[lng, lat, ...]` position; extra ordinates (altitude) are ignored.
fn as_pair(items: &[Value]) -> Option<(f64, f64)> {
    match items {
        [lng, lat, ..] if lng.is_number() => Some((lng.as_f64()?, lat.as_f64()?)),
        _ => None,
    }
}

/// The single position of a `Point` geometry.
pub fn point(geometry: &Value) -> Option<LngLat> {
    if GeometryKind::of(geometry)? != GeometryKind::Point {
        return None;
    }
    let (lng, lat) = as_pair(geometry.get("coordinates")?.as_array()?)?;
    Some(LngLat::new(lng, lat)).filter(LngLat::is_finite)
}

/// Centroid and bounds of any supported geometry, or `None` when the geometry is
/// unsupported, lacks coordinates, or contains no usable position.
pub fn resolve(geometry: &Value) -> Option<ResolvedGeometry> {
    let Some(kind) = GeometryKind::of(geometry) else {
        trace!("Geometry without a supported type");
        return None;
    };
    let coordinates = geometry.get("coordinates").filter(|c| !c.is_null())?;

    let bounds = match kind {
        GeometryKind::Point => {
            let p = point(geometry)?;
            Bounds::new(p.lng, p.lat, p.lng, p.lat)?
        }
        GeometryKind::MultiPoint
        | GeometryKind::LineString
        | GeometryKind::MultiLineString
        | GeometryKind::Polygon
        | GeometryKind::MultiPolygon => {
            let mut extent = Extent::empty();
            extent.walk(coordinates);
            extent.into_bounds()?
        }
    };

    Some(ResolvedGeometry {
        centroid: bounds.center(),
        bounds,
    })
}
