use std::sync::Mutex;

use super::types::EvidencePassage;
use super::RetrievalError;

/// Nearest-neighbour search over embedded passages.
pub trait VectorSearch: Send + Sync {
    /// Up to `top_k` passages with similarity at or above `threshold`,
    /// most similar first.
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<EvidencePassage>, RetrievalError>;
}

/// In-memory store with brute-force cosine search. Used offline and in tests.
pub struct InMemoryVectorStore {
    entries: Mutex<Vec<(EvidencePassage, Vec<f32>)>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, passage: EvidencePassage, embedding: Vec<f32>) -> Result<(), RetrievalError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| RetrievalError::VectorStore("Lock poisoned".into()))?;
        entries.push((passage, embedding));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorSearch for InMemoryVectorStore {
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<EvidencePassage>, RetrievalError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| RetrievalError::VectorStore("Lock poisoned".into()))?;

        let mut scored: Vec<EvidencePassage> = entries
            .iter()
            .map(|(passage, embedding)| {
                passage
                    .clone()
                    .with_similarity(cosine_similarity(query_embedding, embedding))
            })
            .filter(|p| p.similarity >= threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Cosine similarity; 0.0 for mismatched, empty or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(id: &str) -> EvidencePassage {
        EvidencePassage::new(id, "open-patients", id)
    }

    #[test]
    fn cosine_edge_cases() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn search_orders_filters_and_truncates() {
        let store = InMemoryVectorStore::new();
        store.add(passage("orthogonal"), vec![0.0, 1.0]).unwrap();
        store.add(passage("close"), vec![0.9, 0.1]).unwrap();
        store.add(passage("exact"), vec![1.0, 0.0]).unwrap();
        store.add(passage("middle"), vec![0.6, 0.6]).unwrap();
        assert_eq!(store.len(), 4);

        let hits = store.search(&[1.0, 0.0], 2, 0.15).unwrap();
        let ids: Vec<&str> = hits.iter().map(|p| p.case_id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "close"]);
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);

        let all = store.search(&[1.0, 0.0], 10, 0.15).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn empty_store_returns_nothing() {
        let store = InMemoryVectorStore::default();
        assert!(store.is_empty());
        assert!(store.search(&[1.0], 5, 0.0).unwrap().is_empty());
    }
}
