//! Error types for the DAG module

use snowdag_core::{CoreError, Status, TransitionId, VertexId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DagError>;

#[derive(Debug, Error)]
pub enum DagError {
    #[error("Unknown vertex: {0}")]
    UnknownVertex(VertexId),

    #[error("Unknown transition: {0}")]
    UnknownTransition(TransitionId),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Duplicate transition {0} in vertex")]
    DuplicateTransition(TransitionId),

    #[error("Invalid epoch {epoch}: maximum is {max}")]
    InvalidEpoch { epoch: u32, max: u32 },

    #[error("Invalid vertex: {0}")]
    InvalidVertex(String),

    #[error("Invalid transition {id}: {reason}")]
    InvalidTransition { id: TransitionId, reason: String },

    /// Expected outcome of consensus competition, not a fault
    #[error("Verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// The caller broke the decision contract (engine bug)
    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Serializer is not initialized")]
    NotInitialized,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DagError {
    /// Whether this is a verification failure the engine should route to rejection
    pub fn is_verification_failure(&self) -> bool {
        matches!(self, DagError::Verification(_))
    }

    /// Whether this signals a contract violation by the caller
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, DagError::Precondition(_))
    }

    /// Whether an identifier failed to resolve
    pub fn is_unknown(&self) -> bool {
        matches!(self, DagError::UnknownVertex(_) | DagError::UnknownTransition(_))
    }

    pub(crate) fn precondition<S: Into<String>>(msg: S) -> Self {
        DagError::Precondition(msg.into())
    }
}

/// Why a transition may not be voted on
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("transition {id} is already {status}")]
    AlreadyDecided { id: TransitionId, status: Status },

    #[error("transition {id} is restricted: conflicting transition {accepted} was accepted")]
    Restricted { id: TransitionId, accepted: TransitionId },

    #[error("transition {id} depends on {dependency}, which is {status}")]
    UnmetDependency {
        id: TransitionId,
        dependency: TransitionId,
        status: Status,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowdag_core::Id;

    #[test]
    fn test_classification() {
        let id = Id::from_data(b"t");

        let err: DagError = VerificationError::AlreadyDecided {
            id,
            status: Status::Accepted,
        }
        .into();
        assert!(err.is_verification_failure());
        assert!(!err.is_precondition_violation());

        let err = DagError::precondition("double accept");
        assert!(err.is_precondition_violation());
        assert!(!err.is_verification_failure());

        assert!(DagError::UnknownTransition(id).is_unknown());
        assert!(DagError::UnknownVertex(id).is_unknown());
        assert!(!DagError::Decode("bad".into()).is_unknown());
    }

    #[test]
    fn test_display() {
        let id = Id::EMPTY;
        let err = DagError::InvalidEpoch { epoch: 9, max: 4 };
        assert_eq!(err.to_string(), "Invalid epoch 9: maximum is 4");

        let err: DagError = VerificationError::AlreadyDecided {
            id,
            status: Status::Accepted,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Verification failed: transition 00000000 is already Accepted"
        );
    }
}
