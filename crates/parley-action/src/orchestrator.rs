//! Intent pipeline orchestrator.
//!
//! Turns one line of dialogue into at most one pending effect:
//!
//! 1. An explicit `[ACTION: ...]` marker is queued at full confidence with
//!    no decision or confirmation step (`none` stops).
//! 2. Otherwise the lexical registry runs, optionally reconciled with the
//!    semantic matcher.
//! 3. The decision matrix rejects, queues, or asks for confirmation.
//! 4. Confirmation runs as a spawned task; the caller never waits for it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parley_core::config::{ConfirmationConfig, DecisionConfig, ParleyConfig};
use parley_core::settings::SettingsSource;
use parley_core::types::{ActorRef, IntentKind};
use parley_vector::{SemanticMatch, SemanticMatcher};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::confirmation::{
    ConfirmationProvider, ConfirmationRateLimiter, ConfirmationRequest, ConfirmationVerdict,
};
use crate::decision::DecisionMatrix;
use crate::error::ConfirmationError;
use crate::intent::{definition, parse_marker, LexicalRule, Marker, RuleRegistry};
use crate::queue::{ActionQueue, EnqueueRequest};
use crate::types::{AnalysisResult, DecisionKind, DialogueRequest, IntentSource, ScoreBreakdown};

// =============================================================================
// Outcomes
// =============================================================================

/// What [`Orchestrator::process`] did with a line of dialogue.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Nothing to do: empty text, no speaker, or an explicit `none` marker.
    NoAction,
    Rejected { reason: String },
    Enqueued { action_id: Uuid, intent: IntentKind },
    /// A live action for the same intent, actor and target already exists.
    Duplicate { intent: IntentKind },
    /// Confirmation is running in the background.
    AwaitingConfirmation {
        intent: IntentKind,
        handle: ConfirmationHandle,
    },
}

impl ProcessOutcome {
    pub fn is_enqueued(&self) -> bool {
        matches!(self, ProcessOutcome::Enqueued { .. })
    }
}

/// How a background confirmation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationResolution {
    /// Provider confirmed; queued at full confidence. `None` if a duplicate.
    Confirmed { action_id: Option<Uuid> },
    Refused,
    /// Provider failed but the original confidence was high enough to act
    /// at a degraded confidence with extra delay.
    Fallback {
        action_id: Option<Uuid>,
        confidence: f32,
    },
    /// Provider failed and the original confidence was too low to act.
    Dropped { error: String },
}

/// Handle to a background confirmation task.
#[derive(Debug)]
pub struct ConfirmationHandle {
    inner: JoinHandle<ConfirmationResolution>,
}

impl ConfirmationHandle {
    /// Wait for the confirmation to resolve. `None` if the task was aborted.
    pub async fn wait(self) -> Option<ConfirmationResolution> {
        match self.inner.await {
            Ok(resolution) => Some(resolution),
            Err(e) => {
                warn!(error = %e, "Confirmation task did not complete");
                None
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Default)]
struct StatsInner {
    analyses: AtomicU64,
    no_action: AtomicU64,
    rejected: AtomicU64,
    enqueued: AtomicU64,
    duplicates: AtomicU64,
    confirmations_requested: AtomicU64,
    confirmed: AtomicU64,
    refused: AtomicU64,
    confirmation_failures: AtomicU64,
    fallbacks: AtomicU64,
    tokens_used: AtomicU64,
}

impl StatsInner {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrchestratorStats {
    pub analyses: u64,
    pub no_action: u64,
    pub rejected: u64,
    pub enqueued: u64,
    pub duplicates: u64,
    pub confirmations_requested: u64,
    pub confirmed: u64,
    pub refused: u64,
    pub confirmation_failures: u64,
    pub fallbacks: u64,
    pub tokens_used: u64,
}

// =============================================================================
// Confirmation continuation
// =============================================================================

struct ConfirmationContext {
    provider: Arc<dyn ConfirmationProvider>,
    limiter: ConfirmationRateLimiter,
    config: ConfirmationConfig,
    queue: Arc<ActionQueue>,
    stats: Arc<StatsInner>,
}

impl ConfirmationContext {
    async fn call_provider(
        &self,
        request: &ConfirmationRequest,
    ) -> Result<ConfirmationVerdict, ConfirmationError> {
        if !self.limiter.try_acquire() {
            return Err(ConfirmationError::RateLimited);
        }
        let timeout = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(timeout, self.provider.confirm(request)).await {
            Ok(result) => result,
            Err(_) => Err(ConfirmationError::Timeout(self.config.timeout_secs)),
        }
    }

    async fn resolve(&self, request: ConfirmationRequest, delay_secs: f32) -> ConfirmationResolution {
        let base = EnqueueRequest {
            base_delay_secs: delay_secs,
            ..EnqueueRequest::for_intent(request.intent, request.actor, request.target, request.confidence)
        };

        match self.call_provider(&request).await {
            Ok(verdict) => {
                self.stats
                    .tokens_used
                    .fetch_add(u64::from(verdict.tokens_used), Ordering::Relaxed);
                if verdict.confirmed {
                    StatsInner::bump(&self.stats.confirmed);
                    info!(intent = %request.intent, actor = %request.actor, "Confirmation accepted");
                    let action_id = self.enqueue(EnqueueRequest {
                        confidence: 1.0,
                        ..base
                    });
                    ConfirmationResolution::Confirmed { action_id }
                } else {
                    StatsInner::bump(&self.stats.refused);
                    info!(intent = %request.intent, actor = %request.actor, "Confirmation refused");
                    ConfirmationResolution::Refused
                }
            }
            Err(e) => {
                StatsInner::bump(&self.stats.confirmation_failures);
                if request.confidence >= self.config.fallback_min_confidence {
                    let confidence = request.confidence * self.config.fallback_confidence_factor;
                    warn!(
                        intent = %request.intent,
                        error = %e,
                        confidence,
                        "Confirmation failed; falling back to degraded confidence"
                    );
                    StatsInner::bump(&self.stats.fallbacks);
                    let action_id = self.enqueue(
                        EnqueueRequest { confidence, ..base }
                            .with_extra_delay(self.config.fallback_extra_delay_secs),
                    );
                    ConfirmationResolution::Fallback {
                        action_id,
                        confidence,
                    }
                } else {
                    warn!(intent = %request.intent, error = %e, "Confirmation failed; dropping");
                    ConfirmationResolution::Dropped {
                        error: e.to_string(),
                    }
                }
            }
        }
    }

    fn enqueue(&self, request: EnqueueRequest) -> Option<Uuid> {
        let id = self.queue.enqueue(request);
        if id.is_some() {
            StatsInner::bump(&self.stats.enqueued);
        } else {
            StatsInner::bump(&self.stats.duplicates);
        }
        id
    }
}

struct ConfirmationLink {
    context: Arc<ConfirmationContext>,
    runtime: Handle,
}

// =============================================================================
// Orchestrator
// =============================================================================

enum Analysis {
    Stop(ProcessOutcome),
    Ready(AnalysisResult),
}

/// Combines markers, recognisers, the decision matrix, and the queue.
pub struct Orchestrator {
    registry: RuleRegistry,
    matrix: DecisionMatrix,
    queue: Arc<ActionQueue>,
    settings: Arc<dyn SettingsSource>,
    semantic: Option<SemanticMatcher>,
    confirmation: Option<ConfirmationLink>,
    stats: Arc<StatsInner>,
}

impl Orchestrator {
    pub fn builder(queue: Arc<ActionQueue>, settings: Arc<dyn SettingsSource>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(queue, settings)
    }

    pub fn queue(&self) -> &Arc<ActionQueue> {
        &self.queue
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Add or replace a lexical rule.
    pub fn register_rule(&mut self, rule: LexicalRule) {
        self.registry.register(rule);
    }

    /// Whether high-risk intents currently go through confirmation.
    pub fn confirmation_active(&self) -> bool {
        self.confirmation.is_some() && self.settings.confirmation_enabled()
    }

    pub fn stats(&self) -> OrchestratorStats {
        let s = &self.stats;
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        OrchestratorStats {
            analyses: get(&s.analyses),
            no_action: get(&s.no_action),
            rejected: get(&s.rejected),
            enqueued: get(&s.enqueued),
            duplicates: get(&s.duplicates),
            confirmations_requested: get(&s.confirmations_requested),
            confirmed: get(&s.confirmed),
            refused: get(&s.refused),
            confirmation_failures: get(&s.confirmation_failures),
            fallbacks: get(&s.fallbacks),
            tokens_used: get(&s.tokens_used),
        }
    }

    /// Process a line using markers and lexical rules only.
    pub fn process(&self, request: &DialogueRequest) -> ProcessOutcome {
        match self.analyze(request) {
            Analysis::Stop(outcome) => outcome,
            Analysis::Ready(analysis) => self.act(request, analysis),
        }
    }

    /// Process a line, also consulting the semantic matcher when it is
    /// configured and its anchors are loaded.
    pub async fn process_with_semantic(&self, request: &DialogueRequest) -> ProcessOutcome {
        let analysis = match self.analyze(request) {
            Analysis::Stop(outcome) => return outcome,
            Analysis::Ready(analysis) => analysis,
        };

        let analysis = match (&self.semantic, analysis.source) {
            (Some(matcher), IntentSource::Lexical) if matcher.is_ready() => {
                let semantic = matcher
                    .match_text_filtered(&request.text, |k| self.settings.intent_enabled(k))
                    .await;
                reconcile(analysis, semantic)
            }
            _ => analysis,
        };
        self.act(request, analysis)
    }

    fn analyze(&self, request: &DialogueRequest) -> Analysis {
        if request.actor.is_none() {
            debug!("Dialogue without a speaker ignored");
            StatsInner::bump(&self.stats.no_action);
            return Analysis::Stop(ProcessOutcome::NoAction);
        }
        if request.text.trim().is_empty() {
            debug!("Empty dialogue ignored");
            StatsInner::bump(&self.stats.no_action);
            return Analysis::Stop(ProcessOutcome::NoAction);
        }

        StatsInner::bump(&self.stats.analyses);
        match parse_marker(&request.text) {
            Some(Marker::NoAction) => {
                debug!("Explicit no-action marker");
                StatsInner::bump(&self.stats.no_action);
                Analysis::Stop(ProcessOutcome::NoAction)
            }
            Some(Marker::Intent(kind)) if !self.settings.intent_enabled(kind) => {
                StatsInner::bump(&self.stats.rejected);
                Analysis::Stop(ProcessOutcome::Rejected {
                    reason: format!("intent {} is disabled", kind),
                })
            }
            Some(Marker::Intent(kind)) => Analysis::Ready(marker_analysis(kind)),
            None => Analysis::Ready(self.registry.analyze_filtered(
                &request.text,
                &request.context,
                |k| self.settings.intent_enabled(k),
            )),
        }
    }

    fn act(&self, request: &DialogueRequest, analysis: AnalysisResult) -> ProcessOutcome {
        let (Some(actor), Some(intent)) = (request.actor, analysis.intent) else {
            StatsInner::bump(&self.stats.rejected);
            return ProcessOutcome::Rejected {
                reason: "no intent recognised".to_string(),
            };
        };

        if analysis.source == IntentSource::Marker {
            debug!(intent = %intent, "Marker trusted; skipping decision");
            return self.schedule(request, actor, intent, &analysis, analysis.suggested_delay_secs);
        }

        let decision = self.matrix.decide(&analysis, self.confirmation_active());
        debug!(
            intent = %intent,
            confidence = analysis.confidence,
            source = %analysis.source,
            decision = %decision.kind,
            "Decision"
        );

        match decision.kind {
            DecisionKind::Reject => {
                StatsInner::bump(&self.stats.rejected);
                ProcessOutcome::Rejected {
                    reason: decision.reason,
                }
            }
            DecisionKind::ExecuteWithDelay => {
                self.schedule(request, actor, intent, &analysis, decision.delay_secs)
            }
            DecisionKind::RequireConfirmation => {
                let Some(link) = &self.confirmation else {
                    // confirmation_active() implies a link.
                    StatsInner::bump(&self.stats.rejected);
                    return ProcessOutcome::Rejected {
                        reason: "confirmation unavailable".to_string(),
                    };
                };
                StatsInner::bump(&self.stats.confirmations_requested);
                let confirmation = ConfirmationRequest::new(
                    &request.text,
                    intent,
                    analysis.confidence,
                    actor,
                    request.target,
                );
                let context = Arc::clone(&link.context);
                let delay = decision.delay_secs;
                info!(intent = %intent, actor = %actor, confidence = analysis.confidence, "Requesting confirmation");
                let inner = link
                    .runtime
                    .spawn(async move { context.resolve(confirmation, delay).await });
                ProcessOutcome::AwaitingConfirmation {
                    intent,
                    handle: ConfirmationHandle { inner },
                }
            }
        }
    }

    fn schedule(
        &self,
        request: &DialogueRequest,
        actor: ActorRef,
        intent: IntentKind,
        analysis: &AnalysisResult,
        delay_secs: f32,
    ) -> ProcessOutcome {
        let enqueue = EnqueueRequest {
            base_delay_secs: delay_secs,
            ..EnqueueRequest::for_intent(intent, actor, request.target, analysis.confidence)
        };
        match self.queue.enqueue(enqueue) {
            Some(action_id) => {
                StatsInner::bump(&self.stats.enqueued);
                ProcessOutcome::Enqueued { action_id, intent }
            }
            None => {
                StatsInner::bump(&self.stats.duplicates);
                ProcessOutcome::Duplicate { intent }
            }
        }
    }
}

fn marker_analysis(kind: IntentKind) -> AnalysisResult {
    let def = definition(kind);
    AnalysisResult {
        success: true,
        intent: Some(kind),
        confidence: 1.0,
        risk: def.risk,
        suggested_delay_secs: def.base_delay_secs,
        source: IntentSource::Marker,
        breakdown: ScoreBreakdown::default(),
    }
}

/// Merge a lexical result with an optional semantic match.
///
/// Agreement keeps the higher confidence. Disagreement resolves to lexical.
pub fn reconcile(lexical: AnalysisResult, semantic: Option<SemanticMatch>) -> AnalysisResult {
    let Some(m) = semantic else {
        return lexical;
    };

    let def = definition(m.intent);
    let confidence = m.confidence.clamp(0.0, 1.0);

    if !lexical.success {
        return AnalysisResult {
            success: true,
            intent: Some(m.intent),
            confidence,
            risk: def.risk,
            suggested_delay_secs: def.base_delay_secs,
            source: IntentSource::Semantic,
            breakdown: ScoreBreakdown::default(),
        };
    }

    if lexical.intent == Some(m.intent) {
        if confidence > lexical.confidence {
            return AnalysisResult {
                confidence,
                source: IntentSource::Semantic,
                ..lexical
            };
        }
        return lexical;
    }

    info!(
        lexical = ?lexical.intent.map(|k| k.to_string()),
        semantic = %m.intent,
        "Lexical and semantic recognisers disagree; using lexical"
    );
    lexical
}

// =============================================================================
// Builder
// =============================================================================

pub struct OrchestratorBuilder {
    queue: Arc<ActionQueue>,
    settings: Arc<dyn SettingsSource>,
    registry: Option<RuleRegistry>,
    decision: DecisionConfig,
    semantic: Option<SemanticMatcher>,
    provider: Option<Arc<dyn ConfirmationProvider>>,
    confirmation: ConfirmationConfig,
    runtime: Option<Handle>,
}

impl OrchestratorBuilder {
    fn new(queue: Arc<ActionQueue>, settings: Arc<dyn SettingsSource>) -> Self {
        Self {
            queue,
            settings,
            registry: None,
            decision: DecisionConfig::default(),
            semantic: None,
            provider: None,
            confirmation: ConfirmationConfig::default(),
            runtime: None,
        }
    }

    /// Take decision and confirmation settings from a loaded config.
    pub fn config(mut self, config: &ParleyConfig) -> Self {
        self.decision = config.decision.clone();
        self.confirmation = config.confirmation.clone();
        self
    }

    pub fn registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn decision_config(mut self, decision: DecisionConfig) -> Self {
        self.decision = decision;
        self
    }

    pub fn semantic(mut self, matcher: SemanticMatcher) -> Self {
        self.semantic = Some(matcher);
        self
    }

    pub fn confirmation(
        mut self,
        provider: Arc<dyn ConfirmationProvider>,
        config: ConfirmationConfig,
    ) -> Self {
        self.provider = Some(provider);
        self.confirmation = config;
        self
    }

    /// Runtime used for confirmation tasks. Defaults to the current runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Orchestrator {
        let stats = Arc::new(StatsInner::default());

        let confirmation = match self.provider {
            Some(provider) => match self.runtime.or_else(|| Handle::try_current().ok()) {
                Some(runtime) => Some(ConfirmationLink {
                    context: Arc::new(ConfirmationContext {
                        provider,
                        limiter: ConfirmationRateLimiter::new(self.confirmation.max_per_minute),
                        config: self.confirmation,
                        queue: Arc::clone(&self.queue),
                        stats: Arc::clone(&stats),
                    }),
                    runtime,
                }),
                None => {
                    warn!("No tokio runtime available; confirmation disabled");
                    None
                }
            },
            None => None,
        };

        Orchestrator {
            registry: self.registry.unwrap_or_else(RuleRegistry::with_defaults),
            matrix: DecisionMatrix::new(self.decision),
            queue: self.queue,
            settings: self.settings,
            semantic: self.semantic,
            confirmation,
            stats,
        }
    }
}
