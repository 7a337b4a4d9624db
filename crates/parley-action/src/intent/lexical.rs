//! Weighted keyword and pattern scoring for a single intent.
//!
//! One generic [`LexicalRule`] covers every intent; the per-intent behaviour
//! lives entirely in its [`LexicalSignals`] table and an optional context
//! boost callback.

use std::fmt;
use std::sync::Arc;

use parley_core::types::IntentKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RuleError;
use crate::types::{AnalysisContext, PatternHit, ScoreBreakdown};

pub const STRONG_WEIGHT: f32 = 0.4;
pub const WEAK_WEIGHT: f32 = 0.2;
pub const NEGATIVE_WEIGHT: f32 = -0.5;
pub const MAX_CONTEXT_BOOST: f32 = 0.15;

/// A regex with its score contribution. Negative weights penalise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSignal {
    pub pattern: String,
    pub weight: f32,
    pub description: String,
}

/// Keyword and pattern tables for one intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexicalSignals {
    #[serde(default)]
    pub strong: Vec<String>,
    #[serde(default)]
    pub weak: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<PatternSignal>,
}

impl LexicalSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strong(mut self, keywords: &[&str]) -> Self {
        self.strong.extend(keywords.iter().map(|s| s.to_string()));
        self
    }

    pub fn weak(mut self, keywords: &[&str]) -> Self {
        self.weak.extend(keywords.iter().map(|s| s.to_string()));
        self
    }

    pub fn negative(mut self, keywords: &[&str]) -> Self {
        self.negative.extend(keywords.iter().map(|s| s.to_string()));
        self
    }

    pub fn pattern(mut self, pattern: &str, weight: f32, description: &str) -> Self {
        self.patterns.push(PatternSignal {
            pattern: pattern.to_string(),
            weight,
            description: description.to_string(),
        });
        self
    }
}

/// Extra confidence derived from the call's context.
pub type ContextBoost = Arc<dyn Fn(&str, &AnalysisContext) -> f32 + Send + Sync>;

/// Score plus the signals behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleScore {
    pub intent: IntentKind,
    /// Clamped to [0, 1].
    pub confidence: f32,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    regex: Regex,
    weight: f32,
    description: String,
}

/// Lowercase, unify apostrophes, and collapse runs of whitespace.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .replace(['\u{2018}', '\u{2019}'], "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compile one pattern signal.
pub fn compile_pattern(signal: &PatternSignal) -> Result<Regex, RuleError> {
    Regex::new(&signal.pattern).map_err(|e| RuleError::InvalidPattern {
        pattern: signal.pattern.clone(),
        reason: e.to_string(),
    })
}

fn prepare_keywords(keywords: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keywords.len());
    for kw in keywords {
        let kw = normalize(kw);
        if !kw.is_empty() && !out.contains(&kw) {
            out.push(kw);
        }
    }
    out
}

/// Stateless scorer for one intent.
#[derive(Clone)]
pub struct LexicalRule {
    intent: IntentKind,
    strong: Vec<String>,
    weak: Vec<String>,
    negative: Vec<String>,
    patterns: Vec<CompiledPattern>,
    boost: Option<ContextBoost>,
}

impl fmt::Debug for LexicalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LexicalRule")
            .field("intent", &self.intent)
            .field("strong", &self.strong.len())
            .field("weak", &self.weak.len())
            .field("negative", &self.negative.len())
            .field("patterns", &self.patterns.len())
            .field("boost", &self.boost.is_some())
            .finish()
    }
}

impl LexicalRule {
    /// Build a rule. Patterns that fail to compile are skipped with a warning.
    pub fn new(intent: IntentKind, signals: &LexicalSignals) -> Self {
        let patterns = signals
            .patterns
            .iter()
            .filter_map(|signal| match compile_pattern(signal) {
                Ok(regex) => Some(CompiledPattern {
                    regex,
                    weight: signal.weight,
                    description: signal.description.clone(),
                }),
                Err(e) => {
                    warn!(intent = %intent, error = %e, "Skipping lexical pattern");
                    None
                }
            })
            .collect();

        Self {
            intent,
            strong: prepare_keywords(&signals.strong),
            weak: prepare_keywords(&signals.weak),
            negative: prepare_keywords(&signals.negative),
            patterns,
            boost: None,
        }
    }

    pub fn with_boost(
        mut self,
        boost: impl Fn(&str, &AnalysisContext) -> f32 + Send + Sync + 'static,
    ) -> Self {
        self.boost = Some(Arc::new(boost));
        self
    }

    pub fn intent(&self) -> IntentKind {
        self.intent
    }

    /// Number of patterns that compiled.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Score `text` for this rule's intent.
    ///
    /// The context boost only applies once a keyword or pattern has fired, so
    /// context alone never produces a match.
    pub fn score(&self, text: &str, context: &AnalysisContext) -> RuleScore {
        let normalized = normalize(text);
        let mut breakdown = ScoreBreakdown::default();
        let mut total = 0.0f32;

        for kw in &self.strong {
            if normalized.contains(kw.as_str()) {
                total += STRONG_WEIGHT;
                breakdown.strong_hits.push(kw.clone());
            }
        }
        for kw in &self.weak {
            if normalized.contains(kw.as_str()) {
                total += WEAK_WEIGHT;
                breakdown.weak_hits.push(kw.clone());
            }
        }
        for kw in &self.negative {
            if normalized.contains(kw.as_str()) {
                total += NEGATIVE_WEIGHT;
                breakdown.negative_hits.push(kw.clone());
            }
        }
        for p in &self.patterns {
            if p.regex.is_match(&normalized) {
                total += p.weight;
                breakdown.pattern_hits.push(PatternHit {
                    description: p.description.clone(),
                    weight: p.weight,
                });
            }
        }

        if breakdown.any_signal() {
            let boost = self.context_boost(&normalized, context);
            breakdown.context_boost = boost;
            total += boost;
        }

        breakdown.raw_total = total;
        RuleScore {
            intent: self.intent,
            confidence: total.clamp(0.0, 1.0),
            breakdown,
        }
    }

    fn context_boost(&self, normalized: &str, context: &AnalysisContext) -> f32 {
        let Some(boost) = &self.boost else {
            return 0.0;
        };
        let value = boost(normalized, context);
        if !value.is_finite() || value < 0.0 {
            warn!(intent = %self.intent, value, "Ignoring invalid context boost");
            return 0.0;
        }
        value.min(MAX_CONTEXT_BOOST)
    }
}
