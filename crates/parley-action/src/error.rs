//! Error types for the intent pipeline.

use parley_core::types::IntentKind;
use uuid::Uuid;

use crate::queue::PendingStatus;

/// Errors from the delayed execution queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Pending action not found: {0}")]
    NotFound(Uuid),
    #[error("Pending action is not cancellable: {0}")]
    NotCancellable(Uuid),
    #[error("Invalid state transition: {0} -> {1}")]
    InvalidTransition(PendingStatus, PendingStatus),
}

/// Errors from the secondary confirmation call.
#[derive(Debug, thiserror::Error)]
pub enum ConfirmationError {
    #[error("Confirmation timed out after {0} seconds")]
    Timeout(u64),
    #[error("Confirmation provider failed: {0}")]
    Provider(String),
    #[error("Confirmation rate limit exhausted")]
    RateLimited,
}

/// Errors raised by effect dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Effect failed: {0}")]
    Failed(String),
    #[error("No effect handler registered for intent: {0}")]
    Unhandled(IntentKind),
}

/// Errors from building lexical rules.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_error_display() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let err = QueueError::NotFound(id);
        assert_eq!(
            err.to_string(),
            "Pending action not found: 550e8400-e29b-41d4-a716-446655440000"
        );

        let err = QueueError::NotCancellable(id);
        assert!(err.to_string().starts_with("Pending action is not cancellable: "));

        let err = QueueError::InvalidTransition(PendingStatus::Fired, PendingStatus::Cancelled);
        assert_eq!(err.to_string(), "Invalid state transition: fired -> cancelled");
    }

    #[test]
    fn test_confirmation_error_display() {
        assert_eq!(
            ConfirmationError::Timeout(10).to_string(),
            "Confirmation timed out after 10 seconds"
        );
        assert_eq!(
            ConfirmationError::Provider("connection reset".to_string()).to_string(),
            "Confirmation provider failed: connection reset"
        );
        assert_eq!(
            ConfirmationError::RateLimited.to_string(),
            "Confirmation rate limit exhausted"
        );
    }

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::Failed("pawn is downed".to_string());
        assert_eq!(err.to_string(), "Effect failed: pawn is downed");

        let err = DispatchError::Unhandled(IntentKind::Marriage);
        assert_eq!(
            err.to_string(),
            "No effect handler registered for intent: marriage"
        );
    }

    #[test]
    fn test_rule_error_display() {
        let err = RuleError::InvalidPattern {
            pattern: "(unclosed".to_string(),
            reason: "unclosed group".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid pattern '(unclosed': unclosed group");
    }

    #[test]
    fn test_errors_implement_debug() {
        let dbg = format!("{:?}", QueueError::NotFound(Uuid::new_v4()));
        assert!(dbg.contains("NotFound"));

        let dbg = format!("{:?}", ConfirmationError::RateLimited);
        assert!(dbg.contains("RateLimited"));

        let dbg = format!("{:?}", DispatchError::Failed(String::new()));
        assert!(dbg.contains("Failed"));
    }
}
