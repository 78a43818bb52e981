//! Push-channel boundary and its one real transport: a `zenoh` publisher,
//! the pub/sub fan-out the teacher's agent already depends on `zenoh` for.

use async_trait::async_trait;
use zenoh::prelude::*;

use crate::error::AgentError;
use junction_core::{MapPayload, StatusPayload};

#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn publish_map(&self, payload: &MapPayload) -> Result<(), AgentError>;
    async fn publish_status(&self, payload: &StatusPayload) -> Result<(), AgentError>;
}

/// Publishes map and status payloads under `{key}` and `{key}/status`
/// respectively, the way `main.rs`/`carla_mode.rs` publish hazard packets
/// under a single `zenoh` key expression.
pub struct ZenohPushChannel {
    session: zenoh::Session,
    map_key: String,
    status_key: String,
}

impl ZenohPushChannel {
    pub async fn connect(key: &str) -> anyhow::Result<Self> {
        let config = zenoh::Config::default();
        let session = zenoh::open(config).await?;
        Ok(ZenohPushChannel {
            session,
            map_key: key.to_string(),
            status_key: format!("{key}/status"),
        })
    }
}

#[async_trait]
impl PushChannel for ZenohPushChannel {
    async fn publish_map(&self, payload: &MapPayload) -> Result<(), AgentError> {
        let bytes = serde_json::to_vec(payload)?;
        self.session
            .put(self.map_key.as_str(), bytes)
            .await
            .map_err(|e| AgentError::PushFailure(format!("zenoh publish failed: {e}")))
    }

    async fn publish_status(&self, payload: &StatusPayload) -> Result<(), AgentError> {
        let bytes = serde_json::to_vec(payload)?;
        self.session
            .put(self.status_key.as_str(), bytes)
            .await
            .map_err(|e| AgentError::PushFailure(format!("zenoh publish failed: {e}")))
    }
}

/// Control signals accepted by the analysis task's command channel, the
/// Rust shape of `video_processor.py`'s `start_processing`/
/// `stop_processing`/`get_status` and `streaming.py`'s
/// `VideoStreamManager.set_quality`.
#[derive(Debug, Clone)]
pub enum AgentControl {
    Start,
    Stop,
    SetQuality(u8),
    GetStatus(tokio::sync::oneshot::Sender<StatusPayload>),
}
