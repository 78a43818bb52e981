//! On-disk agent configuration: camera calibration, tracking tunables, and
//! the push-channel topic. Mirrors `config.py`'s module-level constants —
//! every field defaults so a missing or partial file still produces a
//! runnable configuration.

use serde::{Deserialize, Serialize};

use junction_core::TrackingConfig;

/// Four pixel/world point correspondences fixing this camera's homography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub image_points: [[f64; 2]; 4],
    pub world_points: [[f64; 2]; 4],
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        // The sample correspondences from the original junction box calibration.
        CalibrationConfig {
            image_points: [[335.0, 102.0], [23.0, 251.0], [584.0, 234.0], [146.0, 404.0]],
            world_points: [
                [37.67675942, 126.74583666],
                [37.67696082, 126.74597894],
                [37.67687015, 126.74558537],
                [37.67703350, 126.74581464],
            ],
        }
    }
}

/// Top-level agent configuration, loaded from a TOML file at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub agent_id: String,
    pub calibration: CalibrationConfig,
    pub tracking: TrackingConfig,
    /// Zenoh key expression the map/status payloads are published under.
    pub zenoh_key: String,
    /// Broadcast-task tick rate, in Hz.
    pub broadcast_hz: f64,
    /// Identifies the camera feed backing this agent (a file path, RTSP
    /// URL, or device index), reported verbatim in the status payload.
    pub video_source: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            agent_id: "junction_agent".to_string(),
            calibration: CalibrationConfig::default(),
            tracking: TrackingConfig::default(),
            zenoh_key: "junction/map".to_string(),
            broadcast_hz: 12.0,
            video_source: "0".to_string(),
        }
    }
}

impl AgentConfig {
    /// Load from `path`, falling back to field-level defaults for anything
    /// the file omits; falls back to [`AgentConfig::default`] entirely if
    /// the file does not exist.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("no config file at {path}, using defaults");
                Ok(AgentConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AgentConfig::load("/nonexistent/path/junction.toml").unwrap();
        assert_eq!(config.agent_id, "junction_agent");
        assert_eq!(config.tracking.car_length, 4.5);
    }

    #[test]
    fn partial_toml_fills_remaining_defaults() {
        let toml_str = r#"
            agent_id = "north_junction"
        "#;
        let config: AgentConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent_id, "north_junction");
        assert_eq!(config.zenoh_key, "junction/map");
    }
}
