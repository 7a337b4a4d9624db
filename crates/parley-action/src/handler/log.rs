//! Effect handler that only records the effect in the log.
//!
//! Used by the command-line host and as a stand-in while a game integration
//! is being wired up.

use parley_core::types::{ActorRef, IntentKind};

use crate::error::DispatchError;
use crate::handler::EffectHandler;
use crate::intent::definition;

pub struct LogEffect {
    intent: IntentKind,
}

impl LogEffect {
    pub fn new(intent: IntentKind) -> Self {
        Self { intent }
    }
}

impl EffectHandler for LogEffect {
    fn intent(&self) -> IntentKind {
        self.intent
    }

    fn apply(&self, actor: ActorRef, target: Option<ActorRef>) -> Result<(), DispatchError> {
        tracing::info!(
            intent = %self.intent,
            actor = %actor,
            target = ?target.map(|t| t.to_string()),
            "Effect applied"
        );
        Ok(())
    }

    fn describe(&self, actor: ActorRef, target: Option<ActorRef>) -> String {
        let label = definition(self.intent).label;
        match target {
            Some(t) => format!("{}: {} -> {}", label, actor, t),
            None => format!("{}: {}", label, actor),
        }
    }
}
