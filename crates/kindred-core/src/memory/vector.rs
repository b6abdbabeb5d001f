//! Cosine similarity helpers shared by the retriever and store implementations.

use std::cmp::Ordering;

use kindred_types::memory::{Memory, RankedMemory};

/// Cosine similarity in `[-1, 1]`. Zero-norm or mismatched vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}

/// Cosine distance (`1 - cosine_similarity`), in `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Order ranked memories by similarity descending, then `last_accessed` descending.
pub fn sort_ranked(ranked: &mut [RankedMemory]) {
    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.memory.last_accessed.cmp(&a.memory.last_accessed))
    });
}

/// Score candidate memories against a query and keep the top `limit`.
///
/// Candidates without an embedding are skipped. Similarity is computed as
/// `1 - cosine_distance`.
pub fn rank_by_similarity(
    candidates: impl IntoIterator<Item = Memory>,
    query: &[f32],
    limit: usize,
) -> Vec<RankedMemory> {
    let mut ranked: Vec<RankedMemory> = candidates
        .into_iter()
        .filter_map(|memory| {
            let embedding = memory.embedding.as_deref()?;
            let similarity = 1.0 - cosine_distance(embedding, query);
            Some(RankedMemory { memory, similarity })
        })
        .collect();

    sort_ranked(&mut ranked);
    ranked.truncate(limit);
    ranked
}
