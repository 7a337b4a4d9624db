//! On-demand feature flags.
//!
//! The pipeline never caches these values: each decision asks the settings
//! source again, so hosts can flip switches while the game is running.

use std::sync::{Arc, RwLock};

use crate::config::ParleyConfig;
use crate::types::IntentKind;

/// Feature flags consumed by the decision pipeline.
pub trait SettingsSource: Send + Sync {
    /// Whether high-risk intents go through secondary confirmation.
    fn confirmation_enabled(&self) -> bool;

    /// Whether the given intent may trigger at all.
    fn intent_enabled(&self, kind: IntentKind) -> bool;
}

impl SettingsSource for ParleyConfig {
    fn confirmation_enabled(&self) -> bool {
        self.confirmation.enabled
    }

    fn intent_enabled(&self, kind: IntentKind) -> bool {
        self.intents.is_enabled(kind)
    }
}

/// Live settings shared between the host UI and the pipeline.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<ParleyConfig>>,
}

impl SharedSettings {
    pub fn new(config: ParleyConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Apply a mutation to the live configuration.
    pub fn update(&self, f: impl FnOnce(&mut ParleyConfig)) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
    }

    /// Clone the current configuration.
    pub fn snapshot(&self) -> ParleyConfig {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SettingsSource for SharedSettings {
    fn confirmation_enabled(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .confirmation
            .enabled
    }

    fn intent_enabled(&self, kind: IntentKind) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .intents
            .is_enabled(kind)
    }
}
