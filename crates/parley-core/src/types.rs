//! Shared value types used across the Parley crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ParleyError;

// =============================================================================
// Intents
// =============================================================================

/// The fixed set of intents Parley can recognise in dialogue text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Recruit,
    Romance,
    BreakUp,
    Marriage,
    Rest,
    Gift,
    Inspire,
    Surrender,
    SocialFight,
}

impl IntentKind {
    /// Every intent, in canonical registration order.
    pub const ALL: [IntentKind; 9] = [
        IntentKind::Recruit,
        IntentKind::Romance,
        IntentKind::BreakUp,
        IntentKind::Marriage,
        IntentKind::Rest,
        IntentKind::Gift,
        IntentKind::Inspire,
        IntentKind::Surrender,
        IntentKind::SocialFight,
    ];

    /// Stable snake_case identifier, also used in markers and config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Recruit => "recruit",
            IntentKind::Romance => "romance",
            IntentKind::BreakUp => "break_up",
            IntentKind::Marriage => "marriage",
            IntentKind::Rest => "rest",
            IntentKind::Gift => "gift",
            IntentKind::Inspire => "inspire",
            IntentKind::Surrender => "surrender",
            IntentKind::SocialFight => "social_fight",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IntentKind {
    type Err = ParleyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParleyError::UnknownIntent(s.to_string()))
    }
}

/// Coarse severity attached to an intent. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

// =============================================================================
// World handles
// =============================================================================

/// Opaque handle to an entity in the host's world model.
///
/// Parley never looks inside an actor; liveness checks go through the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorRef(pub u64);

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Unix timestamp in milliseconds since epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or_default()
    }
}
