//! Intent recognition: definitions, lexical rules, and explicit markers.

pub mod definitions;
pub mod lexical;
pub mod marker;
pub mod registry;
pub mod rules;

pub use definitions::{all_definitions, definition, IntentDefinition};
pub use lexical::{LexicalRule, LexicalSignals, PatternSignal, RuleScore};
pub use marker::{parse_marker, strip_markers, Marker};
pub use registry::RuleRegistry;
