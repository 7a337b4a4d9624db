//! Value types flowing through the intent pipeline.
//!
//! Everything here is created fresh per call and never persisted.

use parley_core::types::{ActorRef, IntentKind, RiskLevel};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Analysis
// =============================================================================

/// Situational flags supplied by the host for one analysis call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Topic the other party proposed just before this line, if any.
    pub proposed_topic: Option<IntentKind>,
    /// Speaker and listener already share a relationship.
    pub existing_relationship: bool,
    /// Speaker fatigue in [0, 1], when the host tracks it.
    pub speaker_fatigue: Option<f32>,
}

impl AnalysisContext {
    pub fn proposed(topic: IntentKind) -> Self {
        Self {
            proposed_topic: Some(topic),
            ..Self::default()
        }
    }
}

/// Which recogniser produced an [`AnalysisResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    Marker,
    Lexical,
    Semantic,
}

impl fmt::Display for IntentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentSource::Marker => write!(f, "marker"),
            IntentSource::Lexical => write!(f, "lexical"),
            IntentSource::Semantic => write!(f, "semantic"),
        }
    }
}

/// A regex pattern that fired during lexical scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternHit {
    pub description: String,
    pub weight: f32,
}

/// Which signals contributed to a lexical score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub strong_hits: Vec<String>,
    pub weak_hits: Vec<String>,
    pub negative_hits: Vec<String>,
    pub pattern_hits: Vec<PatternHit>,
    pub context_boost: f32,
    /// Sum of every contribution before clamping.
    pub raw_total: f32,
}

impl ScoreBreakdown {
    /// True if any keyword or pattern fired, positive or negative.
    pub fn any_signal(&self) -> bool {
        !self.strong_hits.is_empty()
            || !self.weak_hits.is_empty()
            || !self.negative_hits.is_empty()
            || !self.pattern_hits.is_empty()
    }
}

/// Outcome of running the recognisers over one line of dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    pub intent: Option<IntentKind>,
    /// Confidence in [0, 1].
    pub confidence: f32,
    pub risk: RiskLevel,
    pub suggested_delay_secs: f32,
    pub source: IntentSource,
    pub breakdown: ScoreBreakdown,
}

impl AnalysisResult {
    /// An unsuccessful analysis.
    pub fn none() -> Self {
        Self {
            success: false,
            intent: None,
            confidence: 0.0,
            risk: RiskLevel::Low,
            suggested_delay_secs: 0.0,
            source: IntentSource::Lexical,
            breakdown: ScoreBreakdown::default(),
        }
    }
}

// =============================================================================
// Decisions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Reject,
    ExecuteWithDelay,
    RequireConfirmation,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionKind::Reject => write!(f, "reject"),
            DecisionKind::ExecuteWithDelay => write!(f, "execute_with_delay"),
            DecisionKind::RequireConfirmation => write!(f, "require_confirmation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub kind: DecisionKind,
    pub reason: String,
    pub confidence: f32,
    pub risk: RiskLevel,
    pub delay_secs: f32,
}

// =============================================================================
// Requests
// =============================================================================

/// One line of generated dialogue to process.
#[derive(Debug, Clone, Default)]
pub struct DialogueRequest {
    pub text: String,
    /// Speaker. Requests without one are ignored.
    pub actor: Option<ActorRef>,
    /// Listener the effect applies to, if any.
    pub target: Option<ActorRef>,
    pub context: AnalysisContext,
}

impl DialogueRequest {
    pub fn new(text: impl Into<String>, actor: ActorRef) -> Self {
        Self {
            text: text.into(),
            actor: Some(actor),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: ActorRef) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_context(mut self, context: AnalysisContext) -> Self {
        self.context = context;
        self
    }
}
