use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ParleyError, Result};
use crate::types::{IntentKind, RiskLevel};

/// Top-level configuration for Parley.
///
/// Loaded from `~/.parley/config.toml` by default. Every section falls back
/// to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub semantic: SemanticConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    #[serde(default)]
    pub intents: IntentsConfig,
}

impl ParleyConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ParleyConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject threshold combinations that would make the pipeline incoherent.
    pub fn validate(&self) -> Result<()> {
        let (d, q, s, c) = (&self.decision, &self.queue, &self.semantic, &self.confirmation);
        let floats = [
            ("decision.reject_below", d.reject_below),
            ("decision.execute_at", d.execute_at),
            ("decision.high_confidence_at", d.high_confidence_at),
            ("queue.tick_quantum_secs", q.tick_quantum_secs),
            ("queue.jitter_min", q.jitter_min),
            ("queue.jitter_max", q.jitter_max),
            ("queue.recent_clear_interval_secs", q.recent_clear_interval_secs),
            ("semantic.absolute_floor", s.absolute_floor),
            ("semantic.min_gap", s.min_gap),
            ("semantic.confidence_floor", s.confidence_floor),
            ("semantic.conflict_radius", s.conflict_radius),
            ("semantic.required_keyword_bonus", s.required_keyword_bonus),
            ("semantic.ambiguous_keyword_bonus", s.ambiguous_keyword_bonus),
            ("confirmation.fallback_min_confidence", c.fallback_min_confidence),
            ("confirmation.fallback_confidence_factor", c.fallback_confidence_factor),
            ("confirmation.fallback_extra_delay_secs", c.fallback_extra_delay_secs),
        ];
        if let Some((name, value)) = floats.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ParleyError::Config(format!("{} must be finite, got {}", name, value)));
        }


        if !(0.0..=1.0).contains(&d.reject_below)
            || d.reject_below > d.execute_at
            || d.execute_at > d.high_confidence_at
            || d.high_confidence_at > 1.0
        {
            return Err(ParleyError::Config(format!(
                "decision thresholds must satisfy 0 <= {} <= {} <= {} <= 1",
                d.reject_below, d.execute_at, d.high_confidence_at
            )));
        }

        if q.tick_quantum_secs <= 0.0 {
            return Err(ParleyError::Config(
                "queue.tick_quantum_secs must be positive".to_string(),
            ));
        }
        if q.jitter_min <= 0.0 || q.jitter_min > q.jitter_max {
            return Err(ParleyError::Config(format!(
                "queue jitter range invalid: {}..={}",
                q.jitter_min, q.jitter_max
            )));
        }
        Ok(())
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Confidence bands used by the decision matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Below this confidence the text is rejected as "too low".
    pub reject_below: f32,
    /// Below this confidence the text is rejected as "insufficient".
    pub execute_at: f32,
    /// At or above this confidence the match counts as high confidence.
    pub high_confidence_at: f32,
    /// Intents at or above this risk tier go through confirmation when it is
    /// enabled.
    pub confirmation_risk_floor: RiskLevel,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            reject_below: 0.30,
            execute_at: 0.60,
            high_confidence_at: 0.85,
            confirmation_risk_floor: RiskLevel::High,
        }
    }
}

/// Delayed execution queue timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Seconds subtracted from every pending action per tick.
    pub tick_quantum_secs: f32,
    /// Lower bound of the delay jitter multiplier.
    pub jitter_min: f32,
    /// Upper bound of the delay jitter multiplier.
    pub jitter_max: f32,
    /// Tick time after which the recently-fired id set is cleared.
    pub recent_clear_interval_secs: f32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            tick_quantum_secs: 0.25,
            jitter_min: 0.8,
            jitter_max: 1.2,
            recent_clear_interval_secs: 60.0,
        }
    }
}

/// Semantic anchor matching thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    /// Whether the host should wire up the semantic path at all.
    pub enabled: bool,
    /// Adjusted positive similarity must exceed this.
    pub absolute_floor: f32,
    /// Adjusted positive similarity must beat the negative one by more than this.
    pub min_gap: f32,
    /// Adjusted positive similarity must exceed this to count as confident.
    pub confidence_floor: f32,
    /// Runner-up intents within this distance make the result ambiguous.
    pub conflict_radius: f32,
    /// Bonus per distinct required keyword present.
    pub required_keyword_bonus: f32,
    /// Bonus per distinct ambiguous keyword present.
    pub ambiguous_keyword_bonus: f32,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            absolute_floor: 0.45,
            min_gap: 0.10,
            confidence_floor: 0.50,
            conflict_radius: 0.08,
            required_keyword_bonus: 0.08,
            ambiguous_keyword_bonus: 0.03,
        }
    }
}

/// Secondary confirmation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Route high-risk intents through the confirmation provider.
    pub enabled: bool,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum confirmation calls per minute.
    pub max_per_minute: u32,
    /// On provider failure, still act if the original confidence reached this.
    pub fallback_min_confidence: f32,
    /// Multiplier applied to the original confidence on fallback.
    pub fallback_confidence_factor: f32,
    /// Extra seconds added to the base delay on fallback.
    pub fallback_extra_delay_secs: f32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 10,
            max_per_minute: 6,
            fallback_min_confidence: 0.70,
            fallback_confidence_factor: 0.85,
            fallback_extra_delay_secs: 2.0,
        }
    }
}

/// Per-intent enable switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentsConfig {
    /// Intents that must never trigger.
    pub disabled: Vec<IntentKind>,
}

impl IntentsConfig {
    pub fn is_enabled(&self, kind: IntentKind) -> bool {
        !self.disabled.contains(&kind)
    }
}
