//! Semantic anchor matching.
//!
//! Scores an input vector against every loaded anchor set and returns the
//! single winning intent, or nothing when no intent clears every threshold
//! or when two intents are too close to call.

use parley_core::config::SemanticConfig;
use parley_core::types::IntentKind;
use tracing::{debug, warn};

use crate::anchors::{AnchorCache, AnchorSet};
use crate::catalogue::normalize_text;
use crate::similarity::max_similarity;

/// A confident semantic match.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMatch {
    pub intent: IntentKind,
    /// Keyword-adjusted positive similarity, clamped to [0, 1].
    pub confidence: f32,
    pub positive_similarity: f32,
    pub negative_similarity: f32,
}

/// Per-intent score before acceptance checks.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentSimilarity {
    pub intent: IntentKind,
    pub positive: f32,
    pub negative: f32,
    pub adjusted: f32,
}

/// Matcher over an [`AnchorCache`].
#[derive(Debug, Clone)]
pub struct SemanticMatcher {
    cache: AnchorCache,
    config: SemanticConfig,
}

impl SemanticMatcher {
    pub fn new(cache: AnchorCache, config: SemanticConfig) -> Self {
        Self { cache, config }
    }

    pub fn cache(&self) -> &AnchorCache {
        &self.cache
    }

    pub fn config(&self) -> &SemanticConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.cache.is_ready()
    }

    /// Match a precomputed vector for `text` against every intent.
    pub fn match_vector(&self, vector: &[f32], text: &str) -> Option<SemanticMatch> {
        self.match_vector_filtered(vector, text, |_| true)
    }

    /// Like [`match_vector`](Self::match_vector), considering only intents
    /// for which `allow` returns true.
    pub fn match_vector_filtered(
        &self,
        vector: &[f32],
        text: &str,
        allow: impl Fn(IntentKind) -> bool,
    ) -> Option<SemanticMatch> {
        if !self.cache.is_ready() {
            debug!("Anchor cache not ready; skipping semantic match");
            return None;
        }

        let lowered = normalize_text(text);
        let sets = self.cache.sets();

        let mut passing: Vec<IntentSimilarity> = sets
            .values()
            .filter(|set| allow(set.intent))
            .filter_map(|set| self.score_set(set, vector, &lowered))
            .filter(|s| self.accepts(s))
            .collect();

        if passing.is_empty() {
            return None;
        }

        // Stable sort keeps BTreeMap (intent) order among equal scores.
        passing.sort_by(|a, b| b.adjusted.total_cmp(&a.adjusted));
        let winner = &passing[0];

        if let Some(rival) = passing
            .iter()
            .skip(1)
            .find(|s| winner.adjusted - s.adjusted < self.config.conflict_radius)
        {
            debug!(
                winner = %winner.intent,
                winner_score = winner.adjusted,
                rival = %rival.intent,
                rival_score = rival.adjusted,
                "Ambiguous semantic match"
            );
            return None;
        }

        Some(SemanticMatch {
            intent: winner.intent,
            confidence: winner.adjusted.clamp(0.0, 1.0),
            positive_similarity: winner.positive,
            negative_similarity: winner.negative,
        })
    }

    /// Embed `text` with the cache's client and match it.
    ///
    /// Returns `None` when the cache is not ready or the embedding fails.
    pub async fn match_text(&self, text: &str) -> Option<SemanticMatch> {
        self.match_text_filtered(text, |_| true).await
    }

    pub async fn match_text_filtered(
        &self,
        text: &str,
        allow: impl Fn(IntentKind) -> bool,
    ) -> Option<SemanticMatch> {
        if !self.cache.is_ready() {
            debug!("Anchor cache not ready; skipping semantic match");
            return None;
        }
        match self.cache.embedder().embed_boxed(text).await {
            Ok(vector) => self.match_vector_filtered(&vector, text, allow),
            Err(e) => {
                warn!(error = %e, "Embedding failed; skipping semantic match");
                None
            }
        }
    }

    /// Raw per-intent similarity, after keyword gating and bonuses.
    ///
    /// Returns `None` when the intent is vetoed or gated out.
    fn score_set(&self, set: &AnchorSet, vector: &[f32], lowered: &str) -> Option<IntentSimilarity> {
        if let Some(kw) = set.negative_keywords.iter().find(|kw| lowered.contains(kw.as_str())) {
            debug!(intent = %set.intent, keyword = %kw, "Negative keyword veto");
            return None;
        }

        let required_hits = set
            .required_keywords
            .iter()
            .filter(|kw| lowered.contains(kw.as_str()))
            .count();
        if !set.required_keywords.is_empty() && required_hits == 0 {
            return None;
        }

        let positive = max_similarity(vector, &set.positive_vectors)?;
        let negative = max_similarity(vector, &set.negative_vectors).unwrap_or(0.0);

        let ambiguous_hits = set
            .ambiguous_keywords
            .iter()
            .filter(|kw| lowered.contains(kw.as_str()))
            .count();

        let adjusted = positive
            + required_hits as f32 * self.config.required_keyword_bonus
            + ambiguous_hits as f32 * self.config.ambiguous_keyword_bonus;

        Some(IntentSimilarity {
            intent: set.intent,
            positive,
            negative,
            adjusted,
        })
    }

    fn accepts(&self, s: &IntentSimilarity) -> bool {
        s.adjusted > self.config.absolute_floor
            && s.adjusted - s.negative > self.config.min_gap
            && s.adjusted > self.config.confidence_floor
    }
}
