//! Error taxonomy for the tracking/collision-prediction core.
//!
//! Every variant here is handled locally by its caller (dropped detection,
//! skipped update, pair omitted from a snapshot) rather than aborting the
//! pipeline — see the module docs on [`crate::track`] and [`crate::collision`].

use thiserror::Error;

/// Errors produced by the geometric/kinematic core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Homography applied to a point whose homogeneous `w` vanished.
    #[error("projection is invalid: point maps to the line at infinity")]
    InvalidProjection,

    /// A position update arrived with `dt <= 0` against the most recent sample.
    #[error("update timestamp {new_t} is not after the previous sample {prev_t}")]
    StaleOrBackwardTime { prev_t: f64, new_t: f64 },

    /// The constant-velocity closest-approach branch had no relative motion.
    #[error("relative velocity is zero; closest-approach time is undefined")]
    DegenerateGeometry,

    /// The four homography correspondences were collinear or otherwise degenerate.
    #[error("homography is ill-conditioned: {0}")]
    ConfigError(String),
}
