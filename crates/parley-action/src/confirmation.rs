//! Secondary confirmation for high-risk intents.
//!
//! Before a risky effect is queued, the orchestrator can ask an external
//! provider (usually a second, narrower model call) whether the dialogue
//! really means what the recognisers think. Calls are rate-limited with a
//! token bucket and bounded by a timeout.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parley_core::types::{ActorRef, IntentKind, RiskLevel};
use serde::{Deserialize, Serialize};

use crate::error::ConfirmationError;
use crate::intent::definition;

/// What the provider is asked to confirm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub text: String,
    pub intent: IntentKind,
    /// Human-readable intent label, for prompting the provider.
    pub label: String,
    pub confidence: f32,
    pub risk: RiskLevel,
    pub actor: ActorRef,
    pub target: Option<ActorRef>,
}

impl ConfirmationRequest {
    /// Build a request, taking label and risk from the intent definition.
    pub fn new(
        text: &str,
        intent: IntentKind,
        confidence: f32,
        actor: ActorRef,
        target: Option<ActorRef>,
    ) -> Self {
        let def = definition(intent);
        Self {
            text: text.to_string(),
            intent,
            label: def.label.to_string(),
            confidence,
            risk: def.risk,
            actor,
            target,
        }
    }
}

/// The provider's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationVerdict {
    pub confirmed: bool,
    /// Tokens consumed by the call, for accounting.
    pub tokens_used: u32,
}

#[async_trait]
pub trait ConfirmationProvider: Send + Sync {
    async fn confirm(
        &self,
        request: &ConfirmationRequest,
    ) -> Result<ConfirmationVerdict, ConfirmationError>;
}

/// Token-bucket rate limiter for confirmation calls.
///
/// The bucket refills completely once a minute has passed since the last
/// refill.
pub struct ConfirmationRateLimiter {
    max_per_minute: u32,
    window: Duration,
    tokens: Mutex<(u32, Instant)>,
}

impl ConfirmationRateLimiter {
    pub fn new(max_per_minute: u32) -> Self {
        Self::with_window(max_per_minute, Duration::from_secs(60))
    }

    fn with_window(max_per_minute: u32, window: Duration) -> Self {
        Self {
            max_per_minute,
            window,
            tokens: Mutex::new((max_per_minute, Instant::now())),
        }
    }

    /// Try to take a token. Returns `false` when the bucket is empty.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        if state.1.elapsed() >= self.window {
            state.0 = self.max_per_minute;
            state.1 = Instant::now();
        }
        if state.0 > 0 {
            state.0 -= 1;
            true
        } else {
            false
        }
    }

    pub fn remaining(&self) -> u32 {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner()).0
    }
}
