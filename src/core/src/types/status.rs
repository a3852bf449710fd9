//! Decision status shared by transitions and vertices

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision status of a transition or vertex.
///
/// Transitions start `Unknown`, become `Processing` once wrapped for voting,
/// and end in exactly one of `Accepted` or `Rejected`. Vertices are born
/// `Processing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Not yet seen by the consensus layer
    #[default]
    Unknown,
    /// Awaiting a decision
    Processing,
    /// Decided in favour, terminal
    Accepted,
    /// Decided against, terminal
    Rejected,
}

impl Status {
    /// Check if the status is accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Status::Accepted)
    }

    /// Check if the status is rejected
    pub fn is_rejected(&self) -> bool {
        matches!(self, Status::Rejected)
    }

    /// Check if decided (accepted or rejected)
    pub fn is_decided(&self) -> bool {
        self.is_accepted() || self.is_rejected()
    }

    /// Check if the object has been seen (processing or decided)
    pub fn is_fetched(&self) -> bool {
        !matches!(self, Status::Unknown)
    }

    /// Whether moving from `self` to `next` respects the lifecycle
    pub fn can_transition_to(&self, next: Status) -> bool {
        match (self, next) {
            (Status::Unknown, Status::Processing) => true,
            (Status::Unknown | Status::Processing, Status::Accepted | Status::Rejected) => true,
            _ => false,
        }
    }

    /// Single-byte storage encoding
    pub fn to_byte(self) -> u8 {
        match self {
            Status::Unknown => 0,
            Status::Processing => 1,
            Status::Accepted => 2,
            Status::Rejected => 3,
        }
    }

    /// Decode the single-byte storage encoding
    pub fn from_byte(byte: u8) -> crate::Result<Self> {
        match byte {
            0 => Ok(Status::Unknown),
            1 => Ok(Status::Processing),
            2 => Ok(Status::Accepted),
            3 => Ok(Status::Rejected),
            other => Err(CoreError::serialization(format!("Unknown status byte {}", other))),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unknown => write!(f, "Unknown"),
            Status::Processing => write!(f, "Processing"),
            Status::Accepted => write!(f, "Accepted"),
            Status::Rejected => write!(f, "Rejected"),
        }
    }
}
