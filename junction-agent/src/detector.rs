//! Detection source boundary: the neural detector itself is out of scope
//! (see the crate-level Non-goals), but the interface it feeds is real.
//!
//! [`StdinJsonDetectionSource`] generalizes `carla_mode.rs`'s
//! newline-delimited JSON ingestion from its CARLA-specific GPS-bearing
//! record to the pixel-space `{id, bbox, class_id, class_name}` shape a
//! bounding-box detector would actually emit.

use async_trait::async_trait;
use serde::Deserialize;
use std::io::BufRead;

use crate::error::AgentError;

/// One detector output for a single frame, in pixel space.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDetection {
    pub id: i64,
    /// `[x1, y1, x2, y2]` in pixels.
    pub bbox: [f64; 4],
    pub class_id: i32,
    pub class_name: String,
}

impl RawDetection {
    /// The bounding-box center `((x1+x2)/2, (y1+y2)/2)`: the point the
    /// homography projects into world coordinates.
    pub fn bbox_center(&self) -> (f64, f64) {
        let [x1, y1, x2, y2] = self.bbox;
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    }
}

#[async_trait]
pub trait DetectionSource: Send {
    /// Return the next batch of detections for one frame. An empty vector
    /// means "frame observed, nothing detected"; `Err(SourceEof)` means the
    /// upstream has closed for good.
    async fn next_batch(&mut self) -> Result<Vec<RawDetection>, AgentError>;
}

/// Reads newline-delimited JSON detection batches from stdin: one JSON
/// array of [`RawDetection`] per line, matching how the CARLA bridge in
/// `carla_mode.rs` streams one record per line (generalized here from a
/// single detection per line to a whole frame's batch per line).
pub struct StdinJsonDetectionSource {
    lines: std::io::Lines<std::io::StdinLock<'static>>,
}

impl StdinJsonDetectionSource {
    pub fn new() -> Self {
        let stdin = Box::leak(Box::new(std::io::stdin()));
        StdinJsonDetectionSource {
            lines: stdin.lock().lines(),
        }
    }
}

impl Default for StdinJsonDetectionSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DetectionSource for StdinJsonDetectionSource {
    async fn next_batch(&mut self) -> Result<Vec<RawDetection>, AgentError> {
        loop {
            let line = match self.lines.next() {
                Some(Ok(l)) => l,
                Some(Err(e)) => return Err(AgentError::DetectorFailure(e.to_string())),
                None => return Err(AgentError::SourceEof),
            };

            if line.trim().is_empty() {
                continue;
            }

            return serde_json::from_str(&line)
                .map_err(|e| AgentError::DetectorFailure(format!("malformed detection batch: {e}")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_center_is_midpoint() {
        let det = RawDetection {
            id: 1,
            bbox: [100.0, 50.0, 200.0, 150.0],
            class_id: 2,
            class_name: "car".to_string(),
        };
        assert_eq!(det.bbox_center(), (150.0, 100.0));
    }
}
