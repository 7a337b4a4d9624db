//! Delayed execution queue.
//!
//! Recognised intents do not take effect immediately. Each one waits out a
//! jittered delay in this queue, during which it can be cancelled or
//! invalidated. The host drives the countdown by calling
//! [`ActionQueue::tick`] on its own clock, or by spawning [`run_ticker`].
//!
//! Every list mutation happens under one mutex. Effects are dispatched
//! after the lock is released, so a slow or re-entrant dispatcher cannot
//! stall other callers.

pub mod state_machine;
mod ticker;

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use parley_core::config::QueueConfig;
use parley_core::types::{ActorRef, IntentKind, RiskLevel, Timestamp};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::QueueError;
use crate::handler::EffectDispatcher;
use crate::intent::definition;

pub use state_machine::{validate_transition, PendingStatus};
pub use ticker::run_ticker;

/// Host view of entity liveness.
///
/// Called while the queue lock is held; implementations must not call back
/// into the queue.
pub trait WorldModel: Send + Sync {
    fn is_alive(&self, actor: ActorRef) -> bool;
}

/// World where every actor is always alive.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAlive;

impl WorldModel for AlwaysAlive {
    fn is_alive(&self, _actor: ActorRef) -> bool {
        true
    }
}

/// Parameters for a new pending action.
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueRequest {
    pub intent: IntentKind,
    pub actor: ActorRef,
    pub target: Option<ActorRef>,
    /// Delay before jitter.
    pub base_delay_secs: f32,
    pub cancellable: bool,
    pub risk: RiskLevel,
    pub confidence: f32,
}

impl EnqueueRequest {
    /// Request using the intent's own risk tier and base delay.
    pub fn for_intent(
        intent: IntentKind,
        actor: ActorRef,
        target: Option<ActorRef>,
        confidence: f32,
    ) -> Self {
        let def = definition(intent);
        Self {
            intent,
            actor,
            target,
            base_delay_secs: def.base_delay_secs,
            cancellable: true,
            risk: def.risk,
            confidence,
        }
    }

    pub fn with_extra_delay(mut self, secs: f32) -> Self {
        self.base_delay_secs += secs;
        self
    }
}

/// A queued, time-delayed, cancellable effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingAction {
    pub id: Uuid,
    pub intent: IntentKind,
    pub actor: ActorRef,
    pub target: Option<ActorRef>,
    pub total_delay_secs: f32,
    pub remaining_secs: f32,
    pub cancellable: bool,
    pub status: PendingStatus,
    pub risk: RiskLevel,
    pub confidence: f32,
    pub created_at: Timestamp,
}

impl PendingAction {
    fn is_live(&self) -> bool {
        self.status == PendingStatus::Scheduled
    }

    fn same_triple(&self, intent: IntentKind, actor: ActorRef, target: Option<ActorRef>) -> bool {
        self.intent == intent && self.actor == actor && self.target == target
    }

    fn involves(&self, actor: ActorRef) -> bool {
        self.actor == actor || self.target == Some(actor)
    }

    fn transition(&mut self, to: PendingStatus) -> Result<(), QueueError> {
        validate_transition(self.status, to)?;
        self.status = to;
        Ok(())
    }
}

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Actions whose effect was dispatched successfully.
    pub fired: Vec<Uuid>,
    /// Actions whose dispatcher returned an error.
    pub failed: Vec<Uuid>,
    /// Cancelled entries swept from the list.
    pub cancelled: usize,
    /// Entries dropped because an actor disappeared.
    pub invalidated: usize,
}

#[derive(Debug, Default)]
struct QueueState {
    entries: Vec<PendingAction>,
    recently_fired: HashSet<Uuid>,
    since_clear_secs: f32,
}

/// Thread-safe delayed execution queue.
#[derive(Debug)]
pub struct ActionQueue {
    config: QueueConfig,
    state: Mutex<QueueState>,
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

impl ActionQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Seconds removed per tick. Falls back to the default quantum when the
    /// configured one is not a positive finite number.
    pub fn tick_quantum(&self) -> f32 {
        let quantum = self.tick_quantum();
        if quantum.is_finite() && quantum > 0.0 {
            quantum
        } else {
            QueueConfig::default().tick_quantum_secs
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| {
            warn!("Action queue lock poisoned; recovering");
            e.into_inner()
        })
    }

    fn jittered(&self, base: f32) -> f32 {
        let base = if base.is_finite() { base.max(0.0) } else { 0.0 };
        let (min, max) = (self.config.jitter_min, self.config.jitter_max);
        let factor = if !min.is_finite() || !max.is_finite() || min <= 0.0 {
            warn!(jitter_min = min, jitter_max = max, "Invalid jitter range; using no jitter");
            1.0
        } else if min >= max {
            min
        } else {
            rand::rng().random_range(min..=max)
        };
        base * factor
    }

    /// Queue an effect. Returns `None` when a live action already exists for
    /// the same intent, actor and target.
    pub fn enqueue(&self, request: EnqueueRequest) -> Option<Uuid> {
        let delay = self.jittered(request.base_delay_secs);
        let mut state = self.lock();

        if state
            .entries
            .iter()
            .any(|e| e.is_live() && e.same_triple(request.intent, request.actor, request.target))
        {
            debug!(
                intent = %request.intent,
                actor = %request.actor,
                "Duplicate pending action dropped"
            );
            return None;
        }

        let action = PendingAction {
            id: Uuid::new_v4(),
            intent: request.intent,
            actor: request.actor,
            target: request.target,
            total_delay_secs: delay,
            remaining_secs: delay,
            cancellable: request.cancellable,
            status: PendingStatus::Scheduled,
            risk: request.risk,
            confidence: request.confidence,
            created_at: Timestamp::now(),
        };
        let id = action.id;
        info!(
            action_id = %id,
            intent = %action.intent,
            actor = %action.actor,
            delay_secs = delay,
            confidence = action.confidence,
            "Action scheduled"
        );
        state.entries.push(action);
        Some(id)
    }

    /// Cancel a scheduled action.
    pub fn cancel(&self, id: Uuid) -> Result<(), QueueError> {
        let mut state = self.lock();
        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(QueueError::NotFound(id))?;
        if !entry.cancellable {
            return Err(QueueError::NotCancellable(id));
        }
        entry.transition(PendingStatus::Cancelled)?;
        debug!(action_id = %id, "Action cancelled");
        Ok(())
    }

    /// Cancel every cancellable scheduled action where `actor` is the actor
    /// or the target. Returns how many were cancelled.
    pub fn cancel_for_actor(&self, actor: ActorRef) -> usize {
        let mut state = self.lock();
        let mut count = 0;
        for entry in state
            .entries
            .iter_mut()
            .filter(|e| e.is_live() && e.cancellable && e.involves(actor))
        {
            if entry.transition(PendingStatus::Cancelled).is_ok() {
                count += 1;
            }
        }
        if count > 0 {
            debug!(actor = %actor, count, "Cancelled pending actions for actor");
        }
        count
    }

    /// Advance every live action by one tick quantum and fire the due ones.
    pub fn tick(&self, world: &dyn WorldModel, dispatcher: &dyn EffectDispatcher) -> TickReport {
        let quantum = self.config.tick_quantum_secs;
        let mut report = TickReport::default();

        let due: Vec<PendingAction> = {
            let mut state = self.lock();

            state.since_clear_secs += quantum;
            if state.since_clear_secs >= self.config.recent_clear_interval_secs {
                state.recently_fired.clear();
                state.since_clear_secs = 0.0;
            }

            let mut due = Vec::new();
            for entry in state.entries.iter_mut() {
                match entry.status {
                    PendingStatus::Cancelled => {
                        report.cancelled += 1;
                        continue;
                    }
                    PendingStatus::Scheduled => {}
                    PendingStatus::Fired | PendingStatus::Invalidated => continue,
                }

                let actor_gone = !world.is_alive(entry.actor)
                    || entry.target.is_some_and(|t| !world.is_alive(t));
                if actor_gone {
                    if entry.transition(PendingStatus::Invalidated).is_ok() {
                        debug!(action_id = %entry.id, intent = %entry.intent, "Action invalidated");
                        report.invalidated += 1;
                    }
                    continue;
                }

                entry.remaining_secs -= quantum;
                if entry.remaining_secs <= 0.0 && entry.transition(PendingStatus::Fired).is_ok() {
                    due.push(entry.clone());
                }
            }

            let QueueState {
                entries,
                recently_fired,
                ..
            } = &mut *state;
            recently_fired.extend(due.iter().map(|a| a.id));
            entries.retain(PendingAction::is_live);
            due
        };

        for action in due {
            match dispatcher.execute(action.intent, action.actor, action.target) {
                Ok(()) => {
                    info!(action_id = %action.id, intent = %action.intent, "Action fired");
                    report.fired.push(action.id);
                }
                Err(e) => {
                    warn!(action_id = %action.id, intent = %action.intent, error = %e, "Effect dispatch failed");
                    report.failed.push(action.id);
                }
            }
        }
        report
    }

    /// Snapshot of every live action.
    pub fn pending(&self) -> Vec<PendingAction> {
        self.lock().entries.iter().filter(|e| e.is_live()).cloned().collect()
    }

    /// Number of live actions.
    pub fn len(&self) -> usize {
        self.lock().entries.iter().filter(|e| e.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` fired within the current diagnostics window.
    pub fn recently_fired(&self, id: Uuid) -> bool {
        self.lock().recently_fired.contains(&id)
    }

    pub fn recently_fired_count(&self) -> usize {
        self.lock().recently_fired.len()
    }
}
