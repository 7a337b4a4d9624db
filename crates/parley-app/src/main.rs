//! Parley host binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Build the orchestrator (lexical rules, optional semantic anchors,
//!    optional auto-confirmation)
//! 3. Spawn the queue ticker with logging effect handlers
//! 4. Feed stdin lines through the pipeline until EOF or Ctrl-C
//! 5. Wait for in-flight confirmations, drain the queue, and print pipeline
//!    stats as JSON

mod cli;
mod input;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tokio::task::JoinSet;

use parley_action::{
    run_ticker, ActionQueue, AlwaysAlive, ConfirmationError, ConfirmationProvider,
    ConfirmationRequest, ConfirmationVerdict, EffectRegistry, Orchestrator, ProcessOutcome,
};
use parley_core::config::ParleyConfig;
use parley_core::types::ActorRef;
use parley_core::SharedSettings;
use parley_vector::{default_catalogue, AnchorCache, MockEmbedding, SemanticMatcher};

use cli::CliArgs;

/// Longest time to wait for scheduled actions after input ends.
const DRAIN_LIMIT: Duration = Duration::from_secs(30);

/// Confirms everything. Stands in for a second model call.
struct AutoConfirm;

#[async_trait]
impl ConfirmationProvider for AutoConfirm {
    async fn confirm(
        &self,
        request: &ConfirmationRequest,
    ) -> Result<ConfirmationVerdict, ConfirmationError> {
        tracing::info!(intent = %request.intent, actor = %request.actor, "Auto-confirming");
        Ok(ConfirmationVerdict {
            confirmed: true,
            tokens_used: 0,
        })
    }
}

fn report(outcome: ProcessOutcome, confirmations: &mut JoinSet<()>) {
    match outcome {
        ProcessOutcome::NoAction => tracing::debug!("No action"),
        ProcessOutcome::Rejected { reason } => tracing::info!(%reason, "Rejected"),
        ProcessOutcome::Enqueued { action_id, intent } => {
            tracing::info!(%action_id, intent = %intent, "Scheduled")
        }
        ProcessOutcome::Duplicate { intent } => {
            tracing::info!(intent = %intent, "Already scheduled")
        }
        ProcessOutcome::AwaitingConfirmation { intent, handle } => {
            tracing::info!(intent = %intent, "Awaiting confirmation");
            confirmations.spawn(async move {
                match handle.wait().await {
                    Some(resolution) => {
                        tracing::info!(intent = %intent, resolution = ?resolution, "Confirmation resolved")
                    }
                    None => tracing::warn!(intent = %intent, "Confirmation task aborted"),
                }
            });
        }
    }
}

/// Wait for outstanding confirmations so their actions reach the queue.
async fn settle(confirmations: &mut JoinSet<()>) {
    if confirmations.is_empty() {
        return;
    }
    tracing::info!(pending = confirmations.len(), "Waiting for confirmations");
    let waited = tokio::time::timeout(DRAIN_LIMIT, async {
        while confirmations.join_next().await.is_some() {}
    })
    .await;
    if waited.is_err() {
        tracing::warn!(pending = confirmations.len(), "Confirmations unresolved; abandoning them");
        confirmations.abort_all();
    }
}

async fn drain(queue: &ActionQueue) {
    let waited = tokio::time::timeout(DRAIN_LIMIT, async {
        while !queue.is_empty() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await;
    if waited.is_err() {
        tracing::warn!(pending = queue.len(), "Queue not drained; abandoning pending actions");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ParleyConfig::load_or_default(&config_file);
    if args.semantic {
        config.semantic.enabled = true;
    }

    // Tracing.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    // Pipeline.
    let settings = SharedSettings::new(config.clone());
    let queue = Arc::new(ActionQueue::new(config.queue.clone()));
    let mut builder = Orchestrator::builder(Arc::clone(&queue), Arc::new(settings)).config(&config);

    if config.semantic.enabled {
        let cache = AnchorCache::new(Arc::new(MockEmbedding::new()), default_catalogue());
        cache.load()?;
        builder = builder.semantic(SemanticMatcher::new(cache, config.semantic.clone()));
        tracing::info!("Semantic anchor matching enabled");
    }
    if args.auto_confirm {
        builder = builder.confirmation(Arc::new(AutoConfirm), config.confirmation.clone());
    }
    let orchestrator = builder.build();
    if config.confirmation.enabled && !orchestrator.confirmation_active() {
        tracing::info!("No confirmation provider; high-risk intents execute directly");
    }

    // === Background ticker ===

    let shutdown = Arc::new(Notify::new());
    let ticker = tokio::spawn(run_ticker(
        Arc::clone(&queue),
        Arc::new(AlwaysAlive),
        Arc::new(EffectRegistry::with_log_handlers()),
        Arc::clone(&shutdown),
    ));

    // === Dialogue input ===

    let default_actor = ActorRef(args.default_actor);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut confirmations = JoinSet::new();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let request = input::parse_line(&line, default_actor);
                report(orchestrator.process_with_semantic(&request).await, &mut confirmations);
                while confirmations.try_join_next().is_some() {}
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    // Confirmations still in flight may enqueue; let them land first.
    settle(&mut confirmations).await;
    drain(&queue).await;
    shutdown.notify_one();
    ticker.await?;

    println!("{}", serde_json::to_string_pretty(&orchestrator.stats())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_action::{DialogueRequest, LexicalRule, LexicalSignals, RuleRegistry};
    use parley_core::config::{ConfirmationConfig, QueueConfig};
    use parley_core::types::IntentKind;

    /// Confirms after a short pause.
    struct SlowConfirm;

    #[async_trait]
    impl ConfirmationProvider for SlowConfirm {
        async fn confirm(
            &self,
            _request: &ConfirmationRequest,
        ) -> Result<ConfirmationVerdict, ConfirmationError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(ConfirmationVerdict {
                confirmed: true,
                tokens_used: 0,
            })
        }
    }

    #[tokio::test]
    async fn test_settle_waits_for_late_confirmation() {
        let queue = Arc::new(ActionQueue::new(QueueConfig::default()));
        let settings = SharedSettings::default();
        settings.update(|c| c.confirmation.enabled = true);

        let mut registry = RuleRegistry::with_defaults();
        registry.register(LexicalRule::new(
            IntentKind::Recruit,
            &LexicalSignals::new()
                .strong(&["count me in", "join you"])
                .pattern(r"\bgladly\b", 0.1, "eager"),
        ));
        let orchestrator = Orchestrator::builder(Arc::clone(&queue), Arc::new(settings))
            .registry(registry)
            .confirmation(Arc::new(SlowConfirm), ConfirmationConfig::default())
            .build();

        let mut confirmations = JoinSet::new();
        let outcome = orchestrator.process(&DialogueRequest::new(
            "Gladly, count me in, I'll join you",
            ActorRef(1),
        ));
        assert!(matches!(outcome, ProcessOutcome::AwaitingConfirmation { .. }));
        report(outcome, &mut confirmations);
        assert!(queue.is_empty());

        settle(&mut confirmations).await;
        assert!(confirmations.is_empty());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pending()[0].intent, IntentKind::Recruit);
    }

    #[tokio::test]
    async fn test_settle_with_nothing_pending_returns() {
        let mut confirmations = JoinSet::new();
        settle(&mut confirmations).await;
        assert!(confirmations.is_empty());
    }
}
