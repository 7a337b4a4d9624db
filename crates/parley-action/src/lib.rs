//! Intent pipeline for Parley.
//!
//! Recognises intents in generated dialogue, decides whether they are safe
//! to act on, and schedules their effects through a delayed, cancellable
//! queue.

pub mod confirmation;
pub mod decision;
pub mod error;
pub mod handler;
pub mod intent;
pub mod orchestrator;
pub mod queue;
pub mod types;

pub use confirmation::{
    ConfirmationProvider, ConfirmationRateLimiter, ConfirmationRequest, ConfirmationVerdict,
};
pub use decision::DecisionMatrix;
pub use error::{ConfirmationError, DispatchError, QueueError, RuleError};
pub use handler::{EffectDispatcher, EffectHandler, EffectRegistry, LogEffect};
pub use intent::{
    parse_marker, strip_markers, IntentDefinition, LexicalRule, LexicalSignals, Marker,
    RuleRegistry,
};
pub use orchestrator::{
    ConfirmationHandle, ConfirmationResolution, Orchestrator, OrchestratorBuilder,
    OrchestratorStats, ProcessOutcome,
};
pub use queue::{
    run_ticker, ActionQueue, AlwaysAlive, EnqueueRequest, PendingAction, PendingStatus,
    TickReport, WorldModel,
};
pub use types::{
    AnalysisContext, AnalysisResult, DecisionKind, DecisionResult, DialogueRequest,
    IntentSource, ScoreBreakdown,
};
