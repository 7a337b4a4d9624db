//! Built-in lexical tables for every intent.
//!
//! Keywords are matched by substring containment on normalized text, so
//! multi-word phrases are preferred over bare words that hide inside
//! unrelated ones.

use parley_core::types::IntentKind;

use crate::intent::lexical::{LexicalRule, LexicalSignals};
use crate::types::AnalysisContext;

fn proposed_boost(kind: IntentKind, amount: f32) -> impl Fn(&str, &AnalysisContext) -> f32 + Send + Sync {
    move |_, ctx| {
        if ctx.proposed_topic == Some(kind) {
            amount
        } else {
            0.0
        }
    }
}

pub fn recruit_signals() -> LexicalSignals {
    LexicalSignals::new()
        .strong(&["join you", "join your", "count me in", "i'm with you", "i'll stay with you"])
        .weak(&["join", "colony", "recruit", "sign up"])
        .negative(&["refuse", "never", "won't", "no way", "not joining"])
        .pattern(r"\b(?:i'll|i will|let me)\s+join\b", 0.2, "first-person join commitment")
        .pattern(r"\bnot\s+(?:going\s+to\s+)?join\b", -0.3, "negated join")
}

pub fn romance_signals() -> LexicalSignals {
    LexicalSignals::new()
        .strong(&["i love you", "love you too", "be your partner", "feelings for you", "be together"])
        .weak(&["love", "my heart", "kiss", "darling", "sweetheart"])
        .negative(&["just friends", "only a friend", "don't love", "not interested", "never"])
        .pattern(r"\bi(?:'ve| have)\s+(?:always\s+)?(?:loved|liked)\s+you\b", 0.2, "confession")
}

pub fn break_up_signals() -> LexicalSignals {
    LexicalSignals::new()
        .strong(&["break up", "it's over", "we're done", "separate ways", "can't be with you"])
        .weak(&["anymore", "leave you", "goodbye", "done with you"])
        .negative(&["never leave", "stay together", "still love", "not over"])
        .pattern(
            r"\b(?:i want|let's|we should)\s+(?:to\s+)?break\s+up\b",
            0.2,
            "explicit break-up proposal",
        )
}

pub fn marriage_signals() -> LexicalSignals {
    LexicalSignals::new()
        .strong(&["marry you", "marry me", "get married", "be your spouse", "wedding"])
        .weak(&["forever", "engaged", "spouse", "vows"])
        .negative(&["not ready", "never marry", "won't marry", "not marry"])
        .pattern(r"\byes[,!.]?\s+(?:i will|i'll)\s+marry\b", 0.2, "accepted proposal")
}

pub fn rest_signals() -> LexicalSignals {
    LexicalSignals::new()
        .strong(&[
            "tired",
            "exhausted",
            "lie down",
            "need sleep",
            "need some sleep",
            "take a nap",
            "need a rest",
            "need to rest",
        ])
        .weak(&["sleep", "nap", "yawn", "my bed", "take a break"])
        .negative(&["not tired", "no time to rest", "keep working", "keep going"])
        .pattern(r"\bcan(?:'t|not)\s+keep\s+my\s+eyes\s+open\b", 0.3, "fatigue idiom")
}

pub fn gift_signals() -> LexicalSignals {
    LexicalSignals::new()
        .strong(&["take this", "it's yours", "this gift", "a gift for you", "a present"])
        .weak(&["gift", "present", "give you", "have this"])
        .negative(&["keep this", "can't have", "not giving", "not for you"])
        .pattern(r"\bi\s+(?:want|would like)\s+you\s+to\s+have\b", 0.3, "offer to hand over")
}

pub fn inspire_signals() -> LexicalSignals {
    LexicalSignals::new()
        .strong(&["you can do it", "i believe in you", "don't give up", "we can win", "give it everything"])
        .weak(&["believe", "proud of you", "stay strong", "courage"])
        .negative(&["hopeless", "why bother", "never make it", "give up on"])
        .pattern(r"\blet's\s+(?:do|show|win)\b", 0.2, "rallying call")
}

pub fn surrender_signals() -> LexicalSignals {
    LexicalSignals::new()
        .strong(&["i surrender", "i give up", "i yield", "you win", "come quietly"])
        .weak(&["mercy", "spare me", "give up"])
        .negative(&["never surrender", "fight to the end", "don't give up", "never give up"])
        .pattern(r"\b(?:don't|do not)\s+(?:hurt|kill)\s+me\b", 0.2, "plea")
}

pub fn social_fight_signals() -> LexicalSignals {
    LexicalSignals::new()
        .strong(&["punch you", "fight me", "settle this", "hit you", "beat you up", "want a fight"])
        .weak(&["fight", "fists", "idiot", "insult"])
        .negative(&["not fight", "don't want to fight", "calm down", "no fighting"])
        .pattern(r"\bsay\s+that\s+again\b", 0.3, "provocation")
}

/// Signals for an intent.
pub fn signals_for(kind: IntentKind) -> LexicalSignals {
    match kind {
        IntentKind::Recruit => recruit_signals(),
        IntentKind::Romance => romance_signals(),
        IntentKind::BreakUp => break_up_signals(),
        IntentKind::Marriage => marriage_signals(),
        IntentKind::Rest => rest_signals(),
        IntentKind::Gift => gift_signals(),
        IntentKind::Inspire => inspire_signals(),
        IntentKind::Surrender => surrender_signals(),
        IntentKind::SocialFight => social_fight_signals(),
    }
}

/// The built-in rule for an intent, including its context boost.
pub fn default_rule(kind: IntentKind) -> LexicalRule {
    let rule = LexicalRule::new(kind, &signals_for(kind));
    match kind {
        IntentKind::Recruit | IntentKind::Romance | IntentKind::Gift => {
            rule.with_boost(proposed_boost(kind, 0.10))
        }
        IntentKind::BreakUp | IntentKind::Marriage => rule.with_boost(|_, ctx| {
            if ctx.existing_relationship {
                0.10
            } else {
                0.0
            }
        }),
        IntentKind::Rest => {
            rule.with_boost(|_, ctx| ctx.speaker_fatigue.map_or(0.0, |f| f.clamp(0.0, 1.0) * 0.15))
        }
        IntentKind::Inspire | IntentKind::Surrender | IntentKind::SocialFight => rule,
    }
}

/// Built-in rules for every intent, in canonical order.
pub fn default_rules() -> Vec<LexicalRule> {
    IntentKind::ALL.into_iter().map(default_rule).collect()
}
