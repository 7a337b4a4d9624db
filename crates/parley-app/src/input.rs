//! Line format for dialogue read from stdin.
//!
//! ```text
//! 3: I'm so tired, I need to lie down
//! 3>7: Here, take this.
//! I'm exhausted.
//! ```
//!
//! `speaker>target:` is optional. Lines without it are spoken by the default
//! actor. A prefix that does not parse as actor ids is treated as dialogue.

use parley_action::DialogueRequest;
use parley_core::types::ActorRef;

pub fn parse_line(line: &str, default_actor: ActorRef) -> DialogueRequest {
    if let Some((prefix, text)) = line.split_once(':') {
        if let Some((actor, target)) = parse_prefix(prefix.trim()) {
            let request = DialogueRequest::new(text.trim(), actor);
            return match target {
                Some(target) => request.with_target(target),
                None => request,
            };
        }
    }
    DialogueRequest::new(line.trim(), default_actor)
}

fn parse_prefix(prefix: &str) -> Option<(ActorRef, Option<ActorRef>)> {
    match prefix.split_once('>') {
        Some((actor, target)) => Some((
            ActorRef(actor.trim().parse().ok()?),
            Some(ActorRef(target.trim().parse().ok()?)),
        )),
        None => Some((ActorRef(prefix.parse().ok()?), None)),
    }
}
