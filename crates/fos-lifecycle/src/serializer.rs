//! Snapshot persistence
//!
//! The component tree defines only the logical shape of its state; a
//! [`StateSerializer`] turns it into bytes and back.

use fos_component::TreeState;

/// Snapshot encoding errors
#[derive(Debug, thiserror::Error)]
pub enum StateCodecError {
    #[error("JSON state error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Empty state")]
    Empty,
}

/// Converts tree snapshots to and from bytes
pub trait StateSerializer {
    fn encode(&self, state: &TreeState) -> Result<Vec<u8>, StateCodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<TreeState, StateCodecError>;
}

/// JSON snapshots via `serde_json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStateSerializer {
    pretty: bool,
}

impl JsonStateSerializer {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl StateSerializer for JsonStateSerializer {
    fn encode(&self, state: &TreeState) -> Result<Vec<u8>, StateCodecError> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(state)?
        } else {
            serde_json::to_vec(state)?
        };
        tracing::debug!("Encoded view state ({} bytes)", bytes.len());
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<TreeState, StateCodecError> {
        if bytes.is_empty() {
            return Err(StateCodecError::Empty);
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}
