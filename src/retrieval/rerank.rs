//! Lexical reranking of vector-search hits against the raw symptom query.

use std::collections::HashSet;

use super::embedder::tokens;
use super::types::EvidencePassage;

const LEXICAL_WEIGHT: f32 = 0.7;
const VECTOR_WEIGHT: f32 = 0.3;
const STOPWORDS: &[&str] = &["and", "the", "with", "for", "was", "has", "had", "not"];

fn query_terms(query: &str) -> HashSet<String> {
    tokens(query)
        .filter(|t| t.len() >= 3 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Share of query terms present in `text`, 0.0-1.0.
pub fn term_overlap(terms: &HashSet<String>, text: &str) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }
    let words: HashSet<String> = tokens(text).collect();
    terms.iter().filter(|t| words.contains(*t)).count() as f32 / terms.len() as f32
}

/// Blend query-term coverage with the store's similarity and keep the best
/// `top_k`. Ties keep store order.
pub fn rerank(query: &str, passages: Vec<EvidencePassage>, top_k: usize) -> Vec<EvidencePassage> {
    let terms = query_terms(query);
    if terms.is_empty() {
        tracing::debug!("Reranking skipped (no query terms)");
        return passages.into_iter().take(top_k).collect();
    }

    let mut scored: Vec<EvidencePassage> = passages
        .into_iter()
        .map(|mut p| {
            let score = LEXICAL_WEIGHT * term_overlap(&terms, &p.text) + VECTOR_WEIGHT * p.similarity;
            p.rerank_score = Some(score);
            p
        })
        .collect();

    scored.sort_by(|a, b| {
        b.rerank_score
            .partial_cmp(&a.rerank_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    scored
}
