use crate::transcript::TurnId;
use crate::transport::TransportError;

/// Errors surfaced by engine operations.
///
/// Transport failures during streaming are not surfaced here: the engine
/// records them on the turn and returns a failed outcome instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("turn {0} not found")]
    TurnNotFound(TurnId),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl EngineError {
    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }
}
