//! Ordered collection of lexical rules.

use parley_core::types::IntentKind;
use tracing::debug;

use crate::intent::definitions::definition;
use crate::intent::lexical::{LexicalRule, RuleScore};
use crate::intent::rules::default_rules;
use crate::types::{AnalysisContext, AnalysisResult, IntentSource};

/// Runs every registered rule and keeps the best score.
///
/// Ties go to the rule registered first. No confidence threshold is applied
/// here; that is the decision matrix's job.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<LexicalRule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in rule for every intent.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for rule in default_rules() {
            registry.register(rule);
        }
        registry
    }

    /// Add a rule. A rule for an already-registered intent replaces the old
    /// one in its original position.
    pub fn register(&mut self, rule: LexicalRule) {
        match self.rules.iter_mut().find(|r| r.intent() == rule.intent()) {
            Some(existing) => {
                debug!(intent = %rule.intent(), "Replacing lexical rule");
                *existing = rule;
            }
            None => self.rules.push(rule),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Registered intents in registration order.
    pub fn intents(&self) -> Vec<IntentKind> {
        self.rules.iter().map(LexicalRule::intent).collect()
    }

    pub fn analyze(&self, text: &str, context: &AnalysisContext) -> AnalysisResult {
        self.analyze_filtered(text, context, |_| true)
    }

    /// Like [`analyze`](Self::analyze), skipping rules whose intent `allow`
    /// rejects.
    pub fn analyze_filtered(
        &self,
        text: &str,
        context: &AnalysisContext,
        allow: impl Fn(IntentKind) -> bool,
    ) -> AnalysisResult {
        if text.trim().is_empty() {
            return AnalysisResult::none();
        }

        let mut best: Option<RuleScore> = None;
        for rule in self.rules.iter().filter(|r| allow(r.intent())) {
            let score = rule.score(text, context);
            if best.as_ref().map_or(true, |b| score.confidence > b.confidence) {
                best = Some(score);
            }
        }

        match best {
            Some(score) if score.confidence > 0.0 => {
                let def = definition(score.intent);
                debug!(
                    intent = %score.intent,
                    confidence = score.confidence,
                    strong = score.breakdown.strong_hits.len(),
                    weak = score.breakdown.weak_hits.len(),
                    negative = score.breakdown.negative_hits.len(),
                    "Lexical match"
                );
                AnalysisResult {
                    success: true,
                    intent: Some(score.intent),
                    confidence: score.confidence,
                    risk: def.risk,
                    suggested_delay_secs: def.base_delay_secs,
                    source: IntentSource::Lexical,
                    breakdown: score.breakdown,
                }
            }
            _ => AnalysisResult::none(),
        }
    }
}
