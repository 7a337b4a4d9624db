//! Static per-intent metadata: label, risk tier, and base delay.

use parley_core::types::{IntentKind, RiskLevel};

/// Immutable description of one supported intent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentDefinition {
    pub kind: IntentKind,
    pub label: &'static str,
    pub risk: RiskLevel,
    /// Delay before the effect fires, before jitter.
    pub base_delay_secs: f32,
}

const DEFINITIONS: [IntentDefinition; 9] = [
    IntentDefinition {
        kind: IntentKind::Recruit,
        label: "Agree to join",
        risk: RiskLevel::High,
        base_delay_secs: 3.0,
    },
    IntentDefinition {
        kind: IntentKind::Romance,
        label: "Accept romance",
        risk: RiskLevel::High,
        base_delay_secs: 4.0,
    },
    IntentDefinition {
        kind: IntentKind::BreakUp,
        label: "Break up",
        risk: RiskLevel::Critical,
        base_delay_secs: 5.0,
    },
    IntentDefinition {
        kind: IntentKind::Marriage,
        label: "Accept marriage",
        risk: RiskLevel::Critical,
        base_delay_secs: 6.0,
    },
    IntentDefinition {
        kind: IntentKind::Rest,
        label: "Request rest",
        risk: RiskLevel::Low,
        base_delay_secs: 1.5,
    },
    IntentDefinition {
        kind: IntentKind::Gift,
        label: "Give a gift",
        risk: RiskLevel::Medium,
        base_delay_secs: 2.0,
    },
    IntentDefinition {
        kind: IntentKind::Inspire,
        label: "Inspire",
        risk: RiskLevel::Low,
        base_delay_secs: 2.5,
    },
    IntentDefinition {
        kind: IntentKind::Surrender,
        label: "Surrender",
        risk: RiskLevel::High,
        base_delay_secs: 2.0,
    },
    IntentDefinition {
        kind: IntentKind::SocialFight,
        label: "Start a fight",
        risk: RiskLevel::Medium,
        base_delay_secs: 1.0,
    },
];

/// Look up the definition for an intent.
pub fn definition(kind: IntentKind) -> &'static IntentDefinition {
    // DEFINITIONS is laid out in IntentKind::ALL order.
    &DEFINITIONS[kind as usize]
}

/// Every definition, in canonical order.
pub fn all_definitions() -> &'static [IntentDefinition] {
    &DEFINITIONS
}
