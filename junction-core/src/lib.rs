//! Geometric and kinematic core for camera-based road-surveillance
//! collision prediction.
//!
//! A single camera's pixel plane is mapped onto the ground plane through a
//! [`homography::Homography`] fixed once from four point correspondences.
//! Every detection reported in that plane is folded into a [`track::Track`]
//! by [`track::TrackStore`], which derives velocity, heading, and
//! acceleration from bounded position history, and predicts pairwise
//! closest-approach collisions between tracked vehicle footprints. The
//! result of one update cycle is an immutable [`track::Snapshot`], from
//! which [`payload`] builds the GeoJSON-shaped records pushed downstream.

pub mod collision;
pub mod config;
pub mod error;
pub mod footprint;
pub mod geodesy;
pub mod geometry;
pub mod homography;
pub mod payload;
pub mod track;

pub use collision::{closest_approach_time, predict_position};
pub use config::TrackingConfig;
pub use error::CoreError;
pub use footprint::{vehicle_rectangle, RectangleCorners};
pub use geodesy::{bearing, cart_to_latlon, haversine, latlon_to_cart, offset, CartPoint, WorldPoint};
pub use geometry::do_rectangles_intersect;
pub use homography::{Homography, ImagePoint};
pub use payload::{build_map_payload, build_status_payload, MapPayload, StatusPayload};
pub use track::{CollisionKey, Detection, Snapshot, Track, TrackInfo, TrackStore};
