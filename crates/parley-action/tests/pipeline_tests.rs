//! End-to-end tests for the dialogue intent pipeline.
//!
//! Each test builds its own queue, settings and orchestrator, feeds dialogue
//! through it, and drives the queue by hand.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;

use parley_action::{
    ActionQueue, AlwaysAlive, ConfirmationError, ConfirmationProvider, ConfirmationRequest,
    ConfirmationResolution, ConfirmationVerdict, DialogueRequest, DispatchError, EffectDispatcher,
    LexicalRule, LexicalSignals, Orchestrator, ProcessOutcome, RuleRegistry,
};
use parley_core::config::{ConfirmationConfig, ParleyConfig, QueueConfig};
use parley_core::types::{ActorRef, IntentKind, RiskLevel};
use parley_core::SharedSettings;
use parley_vector::{default_catalogue, AnchorCache, MockEmbedding, SemanticMatcher};

// =============================================================================
// Helpers
// =============================================================================

fn queue() -> Arc<ActionQueue> {
    Arc::new(ActionQueue::new(QueueConfig {
        tick_quantum_secs: 0.5,
        ..QueueConfig::default()
    }))
}

fn settings(confirmation: bool) -> SharedSettings {
    let settings = SharedSettings::default();
    settings.update(|c| c.confirmation.enabled = confirmation);
    settings
}

/// Records every dispatched effect.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(IntentKind, ActorRef, Option<ActorRef>)>>,
}

impl Recorder {
    fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl EffectDispatcher for Recorder {
    fn execute(
        &self,
        intent: IntentKind,
        actor: ActorRef,
        target: Option<ActorRef>,
    ) -> Result<(), DispatchError> {
        self.calls.lock().unwrap().push((intent, actor, target));
        Ok(())
    }
}

enum Behaviour {
    Confirm,
    Refuse,
    Fail,
    Hang,
}

struct ScriptedProvider {
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ConfirmationProvider for ScriptedProvider {
    async fn confirm(
        &self,
        _request: &ConfirmationRequest,
    ) -> Result<ConfirmationVerdict, ConfirmationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Confirm => Ok(ConfirmationVerdict {
                confirmed: true,
                tokens_used: 40,
            }),
            Behaviour::Refuse => Ok(ConfirmationVerdict {
                confirmed: false,
                tokens_used: 25,
            }),
            Behaviour::Fail => Err(ConfirmationError::Provider("502 bad gateway".to_string())),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ConfirmationError::Provider("unreachable".to_string()))
            }
        }
    }
}

/// Registry whose Recruit and Rest rules produce exact, known scores.
///
/// Recruit: "count me in" + "join you" + "gladly" = 0.9, without "gladly" 0.8,
/// "count me in" + "perhaps" = 0.65. Rest: "tired" + "sleep" + "yawn" = 0.65.
fn calibrated_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::with_defaults();
    registry.register(LexicalRule::new(
        IntentKind::Recruit,
        &LexicalSignals::new()
            .strong(&["count me in", "join you"])
            .pattern(r"\bgladly\b", 0.1, "eager")
            .pattern(r"\bperhaps\b", 0.25, "tentative"),
    ));
    registry.register(LexicalRule::new(
        IntentKind::Rest,
        &LexicalSignals::new()
            .strong(&["tired"])
            .weak(&["sleep"])
            .pattern(r"\byawn\b", 0.05, "yawn"),
    ));
    registry
}

fn orchestrator_with_provider(
    queue: &Arc<ActionQueue>,
    settings: &SharedSettings,
    provider: Arc<ScriptedProvider>,
    config: ConfirmationConfig,
) -> Orchestrator {
    Orchestrator::builder(Arc::clone(queue), Arc::new(settings.clone()))
        .registry(calibrated_registry())
        .confirmation(provider, config)
        .build()
}

async fn resolve(outcome: ProcessOutcome) -> ConfirmationResolution {
    match outcome {
        ProcessOutcome::AwaitingConfirmation { handle, .. } => {
            handle.wait().await.expect("confirmation task should finish")
        }
        other => panic!("expected confirmation, got {:?}", other),
    }
}

// =============================================================================
// Lexical scenarios
// =============================================================================

#[tokio::test]
async fn test_tired_line_schedules_rest() {
    let queue = queue();
    let orch = Orchestrator::builder(Arc::clone(&queue), Arc::new(settings(true))).build();

    let outcome = orch.process(&DialogueRequest::new("I'm so tired, I need to lie down", ActorRef(1)));
    assert!(outcome.is_enqueued());

    let pending = queue.pending();
    assert_eq!(pending.len(), 1);
    let action = &pending[0];
    assert_eq!(action.intent, IntentKind::Rest);
    assert_eq!(action.risk, RiskLevel::Low);
    assert!(action.confidence >= 0.4);
    assert!(action.total_delay_secs >= 1.2 - 1e-4 && action.total_delay_secs <= 1.8 + 1e-4);
}

#[tokio::test]
async fn test_refusal_line_does_nothing() {
    let queue = queue();
    let orch = Orchestrator::builder(Arc::clone(&queue), Arc::new(settings(true))).build();

    let outcome = orch.process(&DialogueRequest::new("I refuse to join you, never", ActorRef(1)));
    assert!(matches!(outcome, ProcessOutcome::Rejected { .. }));
    assert!(queue.is_empty());
    assert_eq!(orch.stats().rejected, 1);
}

#[tokio::test]
async fn test_low_risk_moderate_confidence_skips_confirmation() {
    let queue = queue();
    let provider = ScriptedProvider::new(Behaviour::Refuse);
    let settings = settings(true);
    let orch = orchestrator_with_provider(&queue, &settings, provider.clone(), ConfirmationConfig::default());

    let outcome = orch.process(&DialogueRequest::new("tired... need sleep *yawn*", ActorRef(1)));
    assert!(outcome.is_enqueued());
    let action = &queue.pending()[0];
    assert_eq!(action.intent, IntentKind::Rest);
    assert!((action.confidence - 0.65).abs() < 1e-4);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

    settings.update(|c| c.confirmation.enabled = false);
    let outcome = orch.process(&DialogueRequest::new("tired... need sleep *yawn*", ActorRef(2)));
    assert!(outcome.is_enqueued());
}

#[tokio::test]
async fn test_registered_rule_replaces_default() {
    let queue = queue();
    let mut orch = Orchestrator::builder(Arc::clone(&queue), Arc::new(settings(false))).build();
    let line = "Catch this flower, it's for you";
    assert!(!orch.process(&DialogueRequest::new(line, ActorRef(1))).is_enqueued());

    orch.register_rule(LexicalRule::new(
        IntentKind::Gift,
        &LexicalSignals::new().strong(&["for you", "catch this"]),
    ));
    assert_eq!(orch.registry().len(), IntentKind::ALL.len());
    assert!(matches!(
        orch.process(&DialogueRequest::new(line, ActorRef(1))),
        ProcessOutcome::Enqueued {
            intent: IntentKind::Gift,
            ..
        }
    ));
}

#[tokio::test]
async fn test_empty_and_speakerless_lines_are_ignored() {
    let queue = queue();
    let orch = Orchestrator::builder(Arc::clone(&queue), Arc::new(settings(true))).build();

    assert!(matches!(
        orch.process(&DialogueRequest::new("   ", ActorRef(1))),
        ProcessOutcome::NoAction
    ));
    let speakerless = DialogueRequest {
        text: "I'm exhausted".to_string(),
        ..DialogueRequest::default()
    };
    assert!(matches!(orch.process(&speakerless), ProcessOutcome::NoAction));
    assert!(queue.is_empty());
}

// =============================================================================
// Markers
// =============================================================================

#[tokio::test]
async fn test_none_marker_stops_pipeline() {
    let queue = queue();
    let orch = Orchestrator::builder(Arc::clone(&queue), Arc::new(settings(true))).build();

    let outcome = orch.process(&DialogueRequest::new(
        "I'm so tired, I need to lie down [ACTION: none]",
        ActorRef(1),
    ));
    assert!(matches!(outcome, ProcessOutcome::NoAction));
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_marker_skips_analysis_at_full_confidence() {
    let queue = queue();
    let orch = Orchestrator::builder(Arc::clone(&queue), Arc::new(settings(false))).build();

    let outcome = orch.process(
        &DialogueRequest::new("Hmm, alright. [ACTION: Recruit]", ActorRef(1)).with_target(ActorRef(2)),
    );
    assert!(outcome.is_enqueued());
    let action = &queue.pending()[0];
    assert_eq!(action.intent, IntentKind::Recruit);
    assert_eq!(action.confidence, 1.0);
    assert_eq!(action.target, Some(ActorRef(2)));
}

#[tokio::test]
async fn test_marker_bypasses_confirmation() {
    let queue = queue();
    let provider = ScriptedProvider::new(Behaviour::Refuse);
    let orch = orchestrator_with_provider(&queue, &settings(true), provider.clone(), ConfirmationConfig::default());
    assert!(orch.confirmation_active());

    let outcome = orch.process(&DialogueRequest::new("Fine. [ACTION: recruit]", ActorRef(1)));
    assert!(matches!(
        outcome,
        ProcessOutcome::Enqueued {
            intent: IntentKind::Recruit,
            ..
        }
    ));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

    let pending = queue.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].confidence, 1.0);
    assert_eq!(pending[0].risk, RiskLevel::High);

    let outcome = orch.process(&DialogueRequest::new("[ACTION: marriage] Yes.", ActorRef(2)));
    assert!(outcome.is_enqueued());
    assert_eq!(orch.stats().confirmations_requested, 0);
}

#[tokio::test]
async fn test_disabled_intent_never_triggers() {
    let queue = queue();
    let settings = settings(false);
    settings.update(|c| c.intents.disabled.push(IntentKind::Rest));
    let orch = Orchestrator::builder(Arc::clone(&queue), Arc::new(settings.clone())).build();

    let outcome = orch.process(&DialogueRequest::new("I'm so tired, I need to lie down", ActorRef(1)));
    assert!(matches!(outcome, ProcessOutcome::Rejected { .. }));
    let outcome = orch.process(&DialogueRequest::new("[ACTION: rest]", ActorRef(1)));
    assert!(matches!(outcome, ProcessOutcome::Rejected { .. }));
    assert!(queue.is_empty());

    settings.update(|c| c.intents.disabled.clear());
    let outcome = orch.process(&DialogueRequest::new("[ACTION: rest]", ActorRef(1)));
    assert!(outcome.is_enqueued());
}

// =============================================================================
// Queue behaviour through the orchestrator
// =============================================================================

#[tokio::test]
async fn test_repeated_line_is_deduplicated() {
    let queue = queue();
    let orch = Orchestrator::builder(Arc::clone(&queue), Arc::new(settings(true))).build();
    let request = DialogueRequest::new("I'm so tired, I need to lie down", ActorRef(1));

    assert!(orch.process(&request).is_enqueued());
    assert!(matches!(
        orch.process(&request),
        ProcessOutcome::Duplicate {
            intent: IntentKind::Rest
        }
    ));
    assert_eq!(queue.len(), 1);
    assert_eq!(orch.stats().duplicates, 1);

    // Another speaker is a different triple.
    assert!(orch
        .process(&DialogueRequest::new("I'm so tired, I need to lie down", ActorRef(2)))
        .is_enqueued());
}

#[tokio::test]
async fn test_cancelled_action_never_dispatches() {
    let queue = queue();
    let recorder = Recorder::default();
    let orch = Orchestrator::builder(Arc::clone(&queue), Arc::new(settings(true))).build();

    let ProcessOutcome::Enqueued { action_id, .. } =
        orch.process(&DialogueRequest::new("I'm so tired, I need to lie down", ActorRef(7)))
    else {
        panic!("expected an enqueued action");
    };
    queue.cancel(action_id).unwrap();

    for _ in 0..20 {
        queue.tick(&AlwaysAlive, &recorder);
    }
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn test_scheduled_action_dispatches_once() {
    let queue = queue();
    let recorder = Recorder::default();
    let orch = Orchestrator::builder(Arc::clone(&queue), Arc::new(settings(true))).build();

    orch.process(&DialogueRequest::new("Here, take this. [ACTION: gift]", ActorRef(3)).with_target(ActorRef(4)));
    for _ in 0..20 {
        queue.tick(&AlwaysAlive, &recorder);
    }
    let calls = recorder.calls.lock().unwrap();
    assert_eq!(calls.as_slice(), &[(IntentKind::Gift, ActorRef(3), Some(ActorRef(4)))]);
}

// =============================================================================
// Confirmation
// =============================================================================

#[tokio::test]
async fn test_high_risk_refused_enqueues_nothing() {
    let queue = queue();
    let provider = ScriptedProvider::new(Behaviour::Refuse);
    let orch = orchestrator_with_provider(&queue, &settings(true), provider.clone(), ConfirmationConfig::default());

    let outcome = orch.process(&DialogueRequest::new("Gladly, count me in, I'll join you", ActorRef(1)));
    assert!(matches!(
        outcome,
        ProcessOutcome::AwaitingConfirmation {
            intent: IntentKind::Recruit,
            ..
        }
    ));
    assert_eq!(resolve(outcome).await, ConfirmationResolution::Refused);
    assert!(queue.is_empty());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    let stats = orch.stats();
    assert_eq!(stats.confirmations_requested, 1);
    assert_eq!(stats.refused, 1);
    assert_eq!(stats.tokens_used, 25);
}

#[tokio::test]
async fn test_high_risk_confirmed_enqueues_at_full_confidence() {
    let queue = queue();
    let provider = ScriptedProvider::new(Behaviour::Confirm);
    let orch = orchestrator_with_provider(&queue, &settings(true), provider, ConfirmationConfig::default());

    let outcome = orch.process(&DialogueRequest::new("Count me in, I'll join you", ActorRef(1)));
    let ConfirmationResolution::Confirmed { action_id: Some(id) } = resolve(outcome).await else {
        panic!("expected a confirmed action");
    };
    let pending = queue.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
    assert_eq!(pending[0].confidence, 1.0);
    assert_eq!(orch.stats().confirmed, 1);
}

#[tokio::test]
async fn test_provider_failure_falls_back_when_confident() {
    let queue = queue();
    let provider = ScriptedProvider::new(Behaviour::Fail);
    let orch = orchestrator_with_provider(&queue, &settings(true), provider, ConfirmationConfig::default());

    let outcome = orch.process(&DialogueRequest::new("Gladly, count me in, I'll join you", ActorRef(1)));
    let ConfirmationResolution::Fallback {
        action_id: Some(_),
        confidence,
    } = resolve(outcome).await
    else {
        panic!("expected a fallback action");
    };
    assert!((confidence - 0.9 * 0.85).abs() < 1e-4);

    let action = &queue.pending()[0];
    assert!((action.confidence - confidence).abs() < 1e-6);
    // Recruit base delay 3.0 plus 2.0 extra, jittered by 0.8..=1.2.
    assert!(action.total_delay_secs >= 4.0 - 1e-4 && action.total_delay_secs <= 6.0 + 1e-4);
    assert_eq!(orch.stats().fallbacks, 1);
}

#[tokio::test]
async fn test_provider_failure_drops_when_not_confident() {
    let queue = queue();
    let provider = ScriptedProvider::new(Behaviour::Fail);
    let orch = orchestrator_with_provider(&queue, &settings(true), provider, ConfirmationConfig::default());

    let outcome = orch.process(&DialogueRequest::new("Perhaps... count me in", ActorRef(1)));
    assert!(matches!(resolve(outcome).await, ConfirmationResolution::Dropped { .. }));
    assert!(queue.is_empty());
    assert_eq!(orch.stats().confirmation_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_provider_timeout_counts_as_failure() {
    let queue = queue();
    let provider = ScriptedProvider::new(Behaviour::Hang);
    let config = ConfirmationConfig {
        timeout_secs: 2,
        ..ConfirmationConfig::default()
    };
    let orch = orchestrator_with_provider(&queue, &settings(true), provider, config);

    let outcome = orch.process(&DialogueRequest::new("Gladly, count me in, I'll join you", ActorRef(1)));
    assert!(matches!(resolve(outcome).await, ConfirmationResolution::Fallback { .. }));
    assert_eq!(orch.stats().confirmation_failures, 1);
}

#[tokio::test]
async fn test_rate_limited_confirmation_counts_as_failure() {
    let queue = queue();
    let provider = ScriptedProvider::new(Behaviour::Confirm);
    let config = ConfirmationConfig {
        max_per_minute: 1,
        ..ConfirmationConfig::default()
    };
    let orch = orchestrator_with_provider(&queue, &settings(true), provider.clone(), config);

    let first = orch.process(&DialogueRequest::new("Count me in, I'll join you", ActorRef(1)));
    assert!(matches!(resolve(first).await, ConfirmationResolution::Confirmed { .. }));

    let second = orch.process(&DialogueRequest::new("Count me in, I'll join you", ActorRef(2)));
    assert!(matches!(resolve(second).await, ConfirmationResolution::Fallback { .. }));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(queue.len(), 2);
}

#[tokio::test]
async fn test_confirmation_off_executes_high_risk_directly() {
    let queue = queue();
    let provider = ScriptedProvider::new(Behaviour::Refuse);
    let orch = orchestrator_with_provider(&queue, &settings(false), provider.clone(), ConfirmationConfig::default());

    let outcome = orch.process(&DialogueRequest::new("Gladly, count me in, I'll join you", ActorRef(1)));
    assert!(outcome.is_enqueued());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Semantic path
// =============================================================================

async fn semantic_orchestrator(queue: &Arc<ActionQueue>, load: bool) -> Orchestrator {
    let cache = AnchorCache::new(Arc::new(MockEmbedding::new()), default_catalogue());
    if load {
        cache.load_and_wait().await.unwrap();
    }
    let matcher = SemanticMatcher::new(cache, Default::default());
    Orchestrator::builder(Arc::clone(queue), Arc::new(settings(false)))
        .semantic(matcher)
        .build()
}

#[tokio::test]
async fn test_semantic_match_lifts_weak_lexical_score() {
    let line = "I'm going to get some sleep.";

    let queue = queue();
    let orch = semantic_orchestrator(&queue, true).await;
    assert!(matches!(
        orch.process(&DialogueRequest::new(line, ActorRef(1))),
        ProcessOutcome::Rejected { .. }
    ));

    let outcome = orch.process_with_semantic(&DialogueRequest::new(line, ActorRef(1))).await;
    assert!(outcome.is_enqueued());
    let action = &queue.pending()[0];
    assert_eq!(action.intent, IntentKind::Rest);
    assert_eq!(action.confidence, 1.0);
}

#[tokio::test]
async fn test_semantic_not_ready_falls_back_to_lexical() {
    let queue = queue();
    let orch = semantic_orchestrator(&queue, false).await;
    let outcome = orch
        .process_with_semantic(&DialogueRequest::new("I'm going to get some sleep.", ActorRef(1)))
        .await;
    assert!(matches!(outcome, ProcessOutcome::Rejected { .. }));
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn test_orchestrator_from_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(
        br#"
[decision]
execute_at = 0.35

[confirmation]
enabled = false
"#,
    )
    .unwrap();
    let config = ParleyConfig::load(file.path()).unwrap();

    let queue = queue();
    let orch = Orchestrator::builder(Arc::clone(&queue), Arc::new(config.clone()))
        .config(&config)
        .build();

    // A single strong keyword (0.4) now clears the lowered bar.
    assert!(orch
        .process(&DialogueRequest::new("I'm exhausted.", ActorRef(1)))
        .is_enqueued());
}
