//! Confidence and risk decision matrix.
//!
//! | confidence            | risk < floor       | risk >= floor, confirmation on |
//! |-----------------------|--------------------|--------------------------------|
//! | < reject_below        | reject (too low)   | reject (too low)               |
//! | < execute_at          | reject (insuff.)   | reject (insufficient)          |
//! | < high_confidence_at  | execute with delay | require confirmation           |
//! | >= high_confidence_at | execute with delay | require confirmation           |
//!
//! High confidence never substitutes for a risk review when confirmation is
//! available.

use parley_core::config::DecisionConfig;
use parley_core::types::RiskLevel;

use crate::types::{AnalysisResult, DecisionKind, DecisionResult};

#[derive(Debug, Clone, Default)]
pub struct DecisionMatrix {
    config: DecisionConfig,
}

impl DecisionMatrix {
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Pure mapping from an analysis to a decision.
    pub fn decide(&self, analysis: &AnalysisResult, confirmation_enabled: bool) -> DecisionResult {
        let c = &self.config;
        let confidence = analysis.confidence;
        let risk = analysis.risk;

        let (kind, reason) = if !analysis.success || analysis.intent.is_none() {
            (DecisionKind::Reject, "no intent recognised".to_string())
        } else if !confidence.is_finite() || confidence < c.reject_below {
            (
                DecisionKind::Reject,
                format!("confidence {:.2} too low", confidence),
            )
        } else if confidence < c.execute_at {
            (
                DecisionKind::Reject,
                format!("confidence {:.2} insufficient", confidence),
            )
        } else if confirmation_enabled && risk >= c.confirmation_risk_floor {
            let band = if confidence >= c.high_confidence_at { "high" } else { "moderate" };
            (
                DecisionKind::RequireConfirmation,
                format!("{} confidence {:.2} with {} risk needs confirmation", band, confidence, risk),
            )
        } else {
            (
                DecisionKind::ExecuteWithDelay,
                format!("confidence {:.2} with {} risk", confidence, risk),
            )
        };

        DecisionResult {
            kind,
            reason,
            confidence,
            risk,
            delay_secs: analysis.suggested_delay_secs,
        }
    }

    /// Whether `risk` would be routed through confirmation when it is on.
    pub fn needs_review(&self, risk: RiskLevel) -> bool {
        risk >= self.config.confirmation_risk_floor
    }
}
