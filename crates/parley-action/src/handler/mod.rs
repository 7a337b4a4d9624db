//! Effect dispatch: the seam between Parley and the host's world.
//!
//! The queue only knows [`EffectDispatcher`]. Hosts either implement it
//! directly or register one [`EffectHandler`] per intent in an
//! [`EffectRegistry`].

pub mod log;

use std::collections::HashMap;
use std::sync::Arc;

use parley_core::types::{ActorRef, IntentKind};

use crate::error::DispatchError;

pub use log::LogEffect;

/// Applies an intent's effect to the world.
pub trait EffectDispatcher: Send + Sync {
    fn execute(
        &self,
        intent: IntentKind,
        actor: ActorRef,
        target: Option<ActorRef>,
    ) -> Result<(), DispatchError>;
}

impl<F> EffectDispatcher for F
where
    F: Fn(IntentKind, ActorRef, Option<ActorRef>) -> Result<(), DispatchError> + Send + Sync,
{
    fn execute(
        &self,
        intent: IntentKind,
        actor: ActorRef,
        target: Option<ActorRef>,
    ) -> Result<(), DispatchError> {
        self(intent, actor, target)
    }
}

/// Effect implementation for a single intent.
pub trait EffectHandler: Send + Sync {
    fn intent(&self) -> IntentKind;

    fn apply(&self, actor: ActorRef, target: Option<ActorRef>) -> Result<(), DispatchError>;

    /// Human-readable description of what `apply` would do.
    fn describe(&self, actor: ActorRef, target: Option<ActorRef>) -> String;
}

/// Routes each intent to its registered handler.
#[derive(Default)]
pub struct EffectRegistry {
    handlers: HashMap<IntentKind, Arc<dyn EffectHandler>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a [`LogEffect`] for every intent.
    pub fn with_log_handlers() -> Self {
        let mut registry = Self::new();
        for kind in IntentKind::ALL {
            registry.register(Arc::new(LogEffect::new(kind)));
        }
        registry
    }

    /// Register a handler, replacing any previous one for the same intent.
    pub fn register(&mut self, handler: Arc<dyn EffectHandler>) {
        self.handlers.insert(handler.intent(), handler);
    }

    pub fn get(&self, intent: IntentKind) -> Option<&Arc<dyn EffectHandler>> {
        self.handlers.get(&intent)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl EffectDispatcher for EffectRegistry {
    fn execute(
        &self,
        intent: IntentKind,
        actor: ActorRef,
        target: Option<ActorRef>,
    ) -> Result<(), DispatchError> {
        let handler = self.get(intent).ok_or(DispatchError::Unhandled(intent))?;
        tracing::debug!(
            intent = %intent,
            effect = %handler.describe(actor, target),
            "Dispatching effect"
        );
        handler.apply(actor, target)
    }
}
