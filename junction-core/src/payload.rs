//! GeoJSON-shaped output records for the pushed map/status payloads.
//!
//! Field and geometry shapes follow `map_utils.py`'s
//! `create_vehicle_geojson`/`create_collision_geojson`/`create_path_geojson`:
//! coordinates are `[lon, lat]` pairs (GeoJSON order, not `(lat, lon)`),
//! polygons are closed (first corner repeated as the last), a vehicle
//! feature carries its footprint rectangle nested under a sibling
//! `rectangle` key rather than as a separate top-level list, and a
//! collision feature's `id` is the canonical `"{min}_{max}"` string.

use serde::{Deserialize, Serialize};

use crate::footprint::RectangleCorners;
use crate::geodesy::WorldPoint;
use crate::track::{CollisionKey, Snapshot};

fn lonlat(p: WorldPoint) -> [f64; 2] {
    [p.lon, p.lat]
}

/// GeoJSON geometry, tagged by `"type"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
}

impl Geometry {
    fn point(p: WorldPoint) -> Self {
        Geometry::Point {
            coordinates: lonlat(p),
        }
    }

    fn line(points: &[WorldPoint]) -> Self {
        Geometry::LineString {
            coordinates: points.iter().copied().map(lonlat).collect(),
        }
    }

    /// A closed polygon ring: the rectangle's four corners plus the first
    /// corner repeated, per the GeoJSON closed-ring requirement.
    fn closed_rectangle(rect: &RectangleCorners) -> Self {
        let mut ring: Vec<[f64; 2]> = rect.iter().copied().map(lonlat).collect();
        ring.push(lonlat(rect[0]));
        Geometry::Polygon {
            coordinates: vec![ring],
        }
    }
}

/// A GeoJSON `Feature`'s literal type tag, serialized as the string
/// `"Feature"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum FeatureType {
    Feature,
}

/// A generic GeoJSON feature wrapping a geometry and a properties payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature<P> {
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
    pub geometry: Geometry,
    pub properties: P,
}

impl<P> Feature<P> {
    fn new(geometry: Geometry, properties: P) -> Self {
        Feature {
            feature_type: FeatureType::Feature,
            geometry,
            properties,
        }
    }
}

/// A geometry-only feature, no properties — used for a vehicle's nested
/// footprint rectangle and a path's nested predicted-path line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryFeature {
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
    pub geometry: Geometry,
}

impl GeometryFeature {
    fn new(geometry: Geometry) -> Self {
        GeometryFeature {
            feature_type: FeatureType::Feature,
            geometry,
        }
    }
}

/// Per-vehicle properties attached to a vehicle point feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleProperties {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub heading: f64,
    pub speed: f64,
    /// `speed` converted to km/h and rounded to one decimal place.
    pub speed_kph: f64,
    pub timestamp: String,
    pub is_collision_risk: bool,
    /// Minimum TTC across every collision pair involving this vehicle;
    /// present only when `is_collision_risk` is true.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ttc: Option<f64>,
    pub class_id: i32,
    pub class_name: String,
}

/// A vehicle point feature with its footprint rectangle nested as a
/// sibling geometry-only feature under `rectangle`, matching
/// `create_vehicle_geojson`'s `geojson['rectangle'] = {...}` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleFeature {
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
    pub geometry: Geometry,
    pub properties: VehicleProperties,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rectangle: Option<GeometryFeature>,
}

/// Properties attached to a predicted-collision point feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionProperties {
    /// Canonical `"{min}_{max}"` pair id.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub vehicle_ids: [i64; 2],
    pub ttc: f64,
    pub timestamp: String,
}

pub type CollisionFeature = Feature<CollisionProperties>;

/// A vehicle's traveled-and-predicted path: the line from its current
/// position (single point here — only the latest sample is retained for
/// the path feature) to its 3-second-ahead predicted position, nested
/// under `predicted_path`, matching `create_path_geojson`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathProperties {
    pub id: String,
    pub vehicle_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathFeature {
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
    pub geometry: Geometry,
    pub properties: PathProperties,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub predicted_path: Option<GeometryFeature>,
}

/// Properties attached to the camera-footprint boundary feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoBoundaryProperties {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
}

pub type VideoBoundaryFeature = Feature<VideoBoundaryProperties>;

/// The map payload pushed to downstream consumers once per broadcast tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapPayload {
    pub vehicles: Vec<VehicleFeature>,
    pub collisions: Vec<CollisionFeature>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub paths: Vec<PathFeature>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub video_boundary: Option<VideoBoundaryFeature>,
}

/// A lightweight heartbeat payload, independent of the map payload, for
/// consumers only interested in liveness. Field shape matches
/// `video_processor.py`'s `get_status()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPayload {
    pub is_processing: bool,
    pub object_count: usize,
    pub collision_count: usize,
    pub video_source: String,
}

/// Build the map payload for one snapshot. `timestamp` must already be
/// formatted (RFC 3339/ISO-8601) by the caller — this module stays a pure
/// function of its inputs and never reads the system clock (per the
/// collision predictor's "must not block" requirement).
pub fn build_map_payload(
    snapshot: &Snapshot,
    timestamp: String,
    include_paths: bool,
    video_boundary: Option<&RectangleCorners>,
) -> MapPayload {
    let mut risk: std::collections::HashMap<i64, f64> = std::collections::HashMap::new();
    for (&(a, b), &ttc) in snapshot.collisions.iter() {
        risk.entry(a).and_modify(|m| *m = m.min(ttc)).or_insert(ttc);
        risk.entry(b).and_modify(|m| *m = m.min(ttc)).or_insert(ttc);
    }

    let mut vehicles = Vec::with_capacity(snapshot.objects.len());
    let mut paths = Vec::new();

    for info in snapshot.objects.values() {
        let ttc = risk.get(&info.id).copied();
        let properties = VehicleProperties {
            id: info.id,
            kind: "vehicle".to_string(),
            heading: info.heading,
            speed: info.speed,
            speed_kph: (info.speed * 3.6 * 10.0).round() / 10.0,
            timestamp: timestamp.clone(),
            is_collision_risk: ttc.is_some(),
            ttc,
            class_id: info.class_id,
            class_name: info.class_name.clone(),
        };

        vehicles.push(VehicleFeature {
            feature_type: FeatureType::Feature,
            geometry: Geometry::point(info.position),
            properties,
            rectangle: info
                .rectangle
                .as_ref()
                .map(|r| GeometryFeature::new(Geometry::closed_rectangle(r))),
        });

        if include_paths {
            if let Some(predicted) = info.predicted_position_3s {
                paths.push(PathFeature {
                    feature_type: FeatureType::Feature,
                    geometry: Geometry::line(&[info.position]),
                    properties: PathProperties {
                        id: format!("path_{}", info.id),
                        vehicle_id: info.id,
                        kind: "path".to_string(),
                    },
                    predicted_path: Some(GeometryFeature::new(Geometry::line(&[predicted]))),
                });
            }
        }
    }

    let mut collisions = Vec::with_capacity(snapshot.collisions.len());
    for (&key, &ttc) in snapshot.collisions.iter() {
        let (a, b) = canonical_pair(key);
        let point = snapshot
            .collision_points
            .get(&key)
            .copied()
            .unwrap_or(WorldPoint::new(0.0, 0.0));
        collisions.push(Feature::new(
            Geometry::point(point),
            CollisionProperties {
                id: format!("{a}_{b}"),
                kind: "collision".to_string(),
                vehicle_ids: [a, b],
                ttc,
                timestamp: timestamp.clone(),
            },
        ));
    }

    MapPayload {
        vehicles,
        collisions,
        paths,
        video_boundary: video_boundary.map(|rect| {
            Feature::new(
                Geometry::closed_rectangle(rect),
                VideoBoundaryProperties {
                    kind: "camera_boundary".to_string(),
                    timestamp: timestamp.clone(),
                },
            )
        }),
    }
}

fn canonical_pair(key: CollisionKey) -> (i64, i64) {
    key
}

/// Build the lightweight status payload for one snapshot.
pub fn build_status_payload(snapshot: &Snapshot, is_processing: bool, video_source: String) -> StatusPayload {
    StatusPayload {
        is_processing,
        object_count: snapshot.objects.len(),
        collision_count: snapshot.collisions.len(),
        video_source,
    }
}
