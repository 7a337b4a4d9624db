//! Parley vector crate - embedding service trait, anchor cache, and semantic
//! anchor matching.
//!
//! Anchors are curated example utterances per intent. Their vectors are
//! fetched once through an injected [`DynEmbeddingService`] and cached; the
//! [`SemanticMatcher`] then compares input vectors against them with keyword
//! gating and multi-threshold acceptance.

pub mod anchors;
pub mod catalogue;
pub mod embedding;
pub mod matcher;
pub mod similarity;

pub use anchors::{AnchorCache, AnchorSet};
pub use catalogue::{default_catalogue, normalize_text, parse_catalogue, AnchorDefinition};
pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding};
pub use matcher::{SemanticMatch, SemanticMatcher};
pub use similarity::cosine_similarity;
