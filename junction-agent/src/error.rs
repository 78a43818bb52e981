//! Agent-level error taxonomy. `junction_core::CoreError` covers the pure
//! algorithmic failures; this enum adds the I/O-boundary failures the
//! driver itself can hit.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("detector unavailable: {0}")]
    DetectorFailure(String),

    #[error("detection source reached end of stream")]
    SourceEof,

    #[error("push channel unavailable: {0}")]
    PushFailure(String),

    #[error("failed to encode outgoing payload: {0}")]
    EncodeFailure(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Core(#[from] junction_core::CoreError),
}
