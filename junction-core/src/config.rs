//! Externally supplied tuning constants, all with the defaults from the
//! original `config.py`.

use serde::{Deserialize, Serialize};

/// Vehicle footprint and prediction parameters shared by the track store
/// and the collision predictor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Vehicle footprint length in meters.
    pub car_length: f64,
    /// Vehicle footprint width in meters.
    pub car_width: f64,
    /// Collision horizon in seconds.
    pub ttc_threshold: f64,
    /// Bounded-history capacity, in samples, per track.
    pub history_size: usize,
    /// A track is evicted once its last sample is older than this, in seconds.
    pub max_inactive: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            car_length: 4.5,
            car_width: 2.0,
            ttc_threshold: 4.0,
            history_size: 10,
            max_inactive: 3.0,
        }
    }
}
