//! Pending action lifecycle.
//!
//! Scheduled -> Cancelled | Fired | Invalidated. All three are terminal.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::QueueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    Scheduled,
    Cancelled,
    Fired,
    Invalidated,
}

impl PendingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PendingStatus::Scheduled)
    }
}

impl fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingStatus::Scheduled => write!(f, "scheduled"),
            PendingStatus::Cancelled => write!(f, "cancelled"),
            PendingStatus::Fired => write!(f, "fired"),
            PendingStatus::Invalidated => write!(f, "invalidated"),
        }
    }
}

/// Validate that a status transition is allowed.
pub fn validate_transition(from: PendingStatus, to: PendingStatus) -> Result<(), QueueError> {
    let valid = matches!(
        (from, to),
        (PendingStatus::Scheduled, PendingStatus::Cancelled)
            | (PendingStatus::Scheduled, PendingStatus::Fired)
            | (PendingStatus::Scheduled, PendingStatus::Invalidated)
    );

    if valid {
        Ok(())
    } else {
        Err(QueueError::InvalidTransition(from, to))
    }
}
