//! Vector similarity helpers.

use tracing::debug;

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for empty, zero-magnitude, or mismatched-dimension inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        debug!(left = a.len(), right = b.len(), "cosine similarity on mismatched dimensions");
        return 0.0;
    }
    if a.is_empty() {
        debug!("cosine similarity on empty vectors");
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        debug!("cosine similarity on zero-magnitude vector");
        return 0.0;
    }

    let sim = dot / (mag_a * mag_b);
    if sim.is_finite() {
        sim as f32
    } else {
        0.0
    }
}

/// Highest cosine similarity between `query` and any vector in `candidates`.
///
/// Returns `None` when there are no candidates.
pub fn max_similarity(query: &[f32], candidates: &[Vec<f32>]) -> Option<f32> {
    candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .fold(None, |best, s| match best {
            Some(b) if b >= s => Some(b),
            _ => Some(s),
        })
}
