//! Anchor definitions: curated example utterances per intent.
//!
//! Positive examples should sound like someone agreeing to the intent,
//! negative examples like someone talking about the same topic while
//! declining it. Keyword lists gate the similarity search.

use parley_core::error::{ParleyError, Result};
use parley_core::types::IntentKind;
use serde::{Deserialize, Serialize};

/// Example utterances and gating keywords for one intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorDefinition {
    pub intent: IntentKind,
    #[serde(default)]
    pub positive_examples: Vec<String>,
    #[serde(default)]
    pub negative_examples: Vec<String>,
    /// At least one must appear in the text when the list is non-empty.
    #[serde(default)]
    pub required_keywords: Vec<String>,
    /// Any one of these vetoes the intent outright.
    #[serde(default)]
    pub negative_keywords: Vec<String>,
    /// Weak topical hints; each adds a small bonus.
    #[serde(default)]
    pub ambiguous_keywords: Vec<String>,
}

impl AnchorDefinition {
    pub fn example_count(&self) -> usize {
        self.positive_examples.len() + self.negative_examples.len()
    }
}

/// Lowercase, unify apostrophes and collapse whitespace so keywords and
/// dialogue compare on the same footing.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .replace('\u{2019}', "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized, non-empty, distinct keywords in first-seen order.
pub(crate) fn prepare_keywords(keywords: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keywords.len());
    for kw in keywords {
        let kw = normalize_text(kw);
        if !kw.is_empty() && !out.contains(&kw) {
            out.push(kw);
        }
    }
    out
}

/// Parse a JSON array of anchor definitions.
///
/// Keywords are normalized and deduplicated.
pub fn parse_catalogue(json: &str) -> Result<Vec<AnchorDefinition>> {
    let mut defs: Vec<AnchorDefinition> = serde_json::from_str(json)?;
    for def in &mut defs {
        if def.positive_examples.is_empty() {
            return Err(ParleyError::Config(format!(
                "anchor definition for {} has no positive examples",
                def.intent
            )));
        }
        def.required_keywords = prepare_keywords(&def.required_keywords);
        def.negative_keywords = prepare_keywords(&def.negative_keywords);
        def.ambiguous_keywords = prepare_keywords(&def.ambiguous_keywords);
    }
    Ok(defs)
}

fn def(
    intent: IntentKind,
    positives: &[&str],
    negatives: &[&str],
    required: &[&str],
    negative_kw: &[&str],
    ambiguous: &[&str],
) -> AnchorDefinition {
    let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    AnchorDefinition {
        intent,
        positive_examples: owned(positives),
        negative_examples: owned(negatives),
        required_keywords: owned(required),
        negative_keywords: owned(negative_kw),
        ambiguous_keywords: owned(ambiguous),
    }
}

/// The built-in anchor catalogue covering every intent.
pub fn default_catalogue() -> Vec<AnchorDefinition> {
    vec![
        def(
            IntentKind::Recruit,
            &[
                "Alright, I'll join your colony.",
                "Count me in, I want to be part of your group.",
                "You've convinced me. I'm with you from now on.",
                "I accept your offer to stay and work with you.",
            ],
            &[
                "I will never join people like you.",
                "Stop asking, I'm not joining your group.",
                "Maybe I'd join someday, but not now.",
            ],
            &["join", "colony", "group", "with you", "stay", "count me in"],
            &["never join", "won't join", "refuse to join", "not joining"],
            &["together", "team", "offer"],
        ),
        def(
            IntentKind::Romance,
            &[
                "I love you too.",
                "Yes, I'd love to be your partner.",
                "I've had feelings for you for a long time.",
                "Let's be together, you and me.",
            ],
            &[
                "I only see you as a friend.",
                "I don't feel that way about you.",
                "Love? Don't be ridiculous.",
            ],
            &["love", "feelings", "together", "partner", "date"],
            &["just friends", "only a friend", "don't love", "not interested"],
            &["heart", "kiss", "beautiful"],
        ),
        def(
            IntentKind::BreakUp,
            &[
                "It's over between us.",
                "I want to break up with you.",
                "We should go our separate ways.",
                "I can't be with you anymore.",
            ],
            &[
                "I would never leave you.",
                "We'll get through this together.",
            ],
            &["over", "break up", "separate", "anymore", "leave you"],
            &["never leave", "stay together", "still love"],
            &["tired of", "done"],
        ),
        def(
            IntentKind::Marriage,
            &[
                "Yes, I will marry you.",
                "I'd be honored to be your spouse.",
                "Let's get married.",
            ],
            &[
                "I'm not ready to get married.",
                "Marriage is not for me.",
            ],
            &["marry", "married", "wedding", "spouse", "engaged"],
            &["not ready", "never marry", "won't marry"],
            &["forever", "ring"],
        ),
        def(
            IntentKind::Rest,
            &[
                "I'm exhausted, I need to lie down.",
                "I'm going to get some sleep.",
                "Let me take a break and rest for a while.",
                "I can barely keep my eyes open.",
            ],
            &[
                "I'm not tired at all, let's keep going.",
                "No time to rest, there's work to do.",
            ],
            &["tired", "sleep", "rest", "lie down", "exhausted", "break"],
            &["not tired", "no time to rest", "keep working"],
            &["bed", "yawn"],
        ),
        def(
            IntentKind::Gift,
            &[
                "Here, take this, it's yours.",
                "I want you to have this as a gift.",
                "Please accept this present from me.",
            ],
            &[
                "I'm keeping this for myself.",
                "You can't have this.",
            ],
            &["take this", "gift", "present", "yours", "have this"],
            &["keep this", "can't have", "not giving"],
            &["give", "offer"],
        ),
        def(
            IntentKind::Inspire,
            &[
                "You can do it, I believe in you!",
                "Let's give it everything we've got today.",
                "Don't give up, you're stronger than you think.",
            ],
            &[
                "Why bother, it's hopeless.",
                "Give up, you'll never make it.",
            ],
            &["believe", "can do it", "don't give up", "strong", "everything"],
            &["hopeless", "why bother", "never make it"],
            &["proud", "great"],
        ),
        def(
            IntentKind::Surrender,
            &[
                "I surrender, please don't hurt me.",
                "I give up, I yield.",
                "Fine, you win, I'll come quietly.",
            ],
            &[
                "I'll never surrender to you.",
                "You'll have to drag me away.",
            ],
            &["surrender", "give up", "yield", "you win", "come quietly"],
            &["never surrender", "fight to the end"],
            &["mercy", "spare"],
        ),
        def(
            IntentKind::SocialFight,
            &[
                "Say that again and I'll punch you.",
                "Let's settle this with our fists.",
                "You want a fight? You've got one.",
            ],
            &[
                "Let's not fight about this.",
                "I don't want to hurt you.",
            ],
            &["fight", "punch", "fists", "hit you", "beat you"],
            &["not fight", "don't want to fight", "calm down"],
            &["angry", "insult"],
        ),
    ]
}
