//! Evidence retrieval over the similar-case store.
//!
//! A symptom query is embedded, searched in the vector store, reranked
//! lexically and filtered down to passages with diagnostic value. Every
//! stage is optional for the caller: a missing store means no citations,
//! never a failed request.

pub mod citations;
pub mod embedder;
pub mod qdrant;
pub mod quality;
pub mod rerank;
pub mod store;
pub mod types;

pub use citations::CitationAllocator;
pub use embedder::{EmbeddingModel, HashEmbedder, OllamaEmbedder};
pub use qdrant::QdrantClient;
pub use quality::EvidenceQualityFilter;
pub use rerank::rerank;
pub use store::{cosine_similarity, InMemoryVectorStore, VectorSearch};
pub use types::{EvidencePassage, EvidenceQuality, RetrievedEvidence};

use thiserror::Error;

use crate::config::Settings;
use crate::knowledge::ClinicalKnowledgeBase;
use crate::pipeline::expansion::{expand_query, DEFAULT_QUERY_EXPANSIONS};

/// Candidates pulled from the store before reranking.
const SEARCH_CANDIDATES: usize = 10;
/// Passages kept after reranking.
const RERANKED_PASSAGES: usize = 5;
/// Minimum quality score for a passage to be cited.
pub const MIN_QUALITY_SCORE: f64 = 0.6;
/// Symptoms that make up the retrieval query.
const QUERY_SYMPTOMS: usize = 5;
/// Note prefix used as the query when no symptom was extracted.
const NOTE_QUERY_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector store is not reachable at {0}")]
    Connection(String),

    #[error("Vector store request timed out after {0}s")]
    Timeout(u64),

    #[error("Vector store returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),
}

pub(crate) fn map_send_error(err: reqwest::Error, base_url: &str, timeout_secs: u64) -> RetrievalError {
    if err.is_timeout() {
        RetrievalError::Timeout(timeout_secs)
    } else if err.is_connect() {
        RetrievalError::Connection(base_url.to_string())
    } else {
        RetrievalError::HttpClient(err.to_string())
    }
}

/// Embedder, store and filter wired together for one pipeline.
pub struct EvidenceRetriever {
    embedder: Box<dyn EmbeddingModel>,
    store: Box<dyn VectorSearch>,
    quality: EvidenceQualityFilter,
    search_k: usize,
    similarity_threshold: f32,
}

impl EvidenceRetriever {
    pub fn new(
        embedder: Box<dyn EmbeddingModel>,
        store: Box<dyn VectorSearch>,
        quality: EvidenceQualityFilter,
    ) -> Self {
        Self {
            embedder,
            store,
            quality,
            search_k: SEARCH_CANDIDATES,
            similarity_threshold: 0.15,
        }
    }

    pub fn with_search_limits(mut self, top_k: usize, similarity_threshold: f32) -> Self {
        self.search_k = top_k.clamp(1, SEARCH_CANDIDATES);
        self.similarity_threshold = similarity_threshold;
        self
    }

    /// Qdrant plus Ollama embeddings when `QDRANT_URL` is set; `None`
    /// disables retrieval.
    pub fn from_settings(
        settings: &Settings,
        kb: &ClinicalKnowledgeBase,
    ) -> Result<Option<Self>, RetrievalError> {
        let Some(url) = settings.qdrant_url.as_deref() else {
            tracing::warn!("QDRANT_URL not set; evidence retrieval disabled");
            return Ok(None);
        };

        let embedder = OllamaEmbedder::new(
            &settings.ollama_url,
            &settings.ollama_embedding_model,
            settings.embedding_dimension,
            settings.llm_timeout_secs,
        )?;
        let store = QdrantClient::new(
            url,
            settings.qdrant_api_key.as_deref(),
            &settings.qdrant_collection,
            settings.llm_timeout_secs,
        )?;

        tracing::info!(
            qdrant = url,
            collection = %settings.qdrant_collection,
            embedding_model = %settings.ollama_embedding_model,
            "Evidence retrieval enabled"
        );

        Ok(Some(
            Self::new(
                Box::new(embedder),
                Box::new(store),
                EvidenceQualityFilter::from_knowledge_base(kb),
            )
            .with_search_limits(settings.top_k_retrieval, settings.similarity_threshold as f32),
        ))
    }

    /// Search for passages describing similar presentations.
    pub fn retrieve(&self, symptoms: &[String], note: &str) -> Result<RetrievedEvidence, RetrievalError> {
        let query = symptom_query(symptoms, note);
        if query.is_empty() {
            return Ok(RetrievedEvidence::default());
        }

        let expanded = expand_query(&query, DEFAULT_QUERY_EXPANSIONS);
        let embedding = self.embedder.embed(&expanded)?;
        let candidates = self
            .store
            .search(&embedding, self.search_k, self.similarity_threshold)?;
        let retrieved = candidates.len();

        let reranked = rerank(&query, candidates, RERANKED_PASSAGES);
        let considered = reranked.len();
        let passages = self.quality.filter(reranked, MIN_QUALITY_SCORE);
        let explanation = EvidenceQualityFilter::explain(considered, passages.len());

        tracing::info!(
            retrieved,
            considered,
            kept = passages.len(),
            explanation = %explanation,
            "Evidence retrieval complete"
        );

        Ok(RetrievedEvidence {
            passages,
            retrieved,
            explanation,
        })
    }
}

/// First few symptom names joined; the note prefix when there are none.
pub fn symptom_query(symptoms: &[String], note: &str) -> String {
    let joined = symptoms
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(QUERY_SYMPTOMS)
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        note.trim().chars().take(NOTE_QUERY_CHARS).collect()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeBundle;

    fn passage(case_id: &str, text: &str) -> EvidencePassage {
        EvidencePassage::new(case_id, "open-patients", text)
    }

    fn retriever(passages: Vec<EvidencePassage>) -> EvidenceRetriever {
        let embedder = HashEmbedder::new(64);
        let store = InMemoryVectorStore::new();
        for p in passages {
            let embedding = embedder.embed(&p.text).unwrap();
            store.add(p, embedding).unwrap();
        }
        let kb = KnowledgeBundle::bundled().unwrap().clinical_kb;
        EvidenceRetriever::new(
            Box::new(embedder),
            Box::new(store),
            EvidenceQualityFilter::from_knowledge_base(&kb),
        )
        .with_search_limits(10, -1.0)
    }

    #[test]
    fn query_uses_first_five_symptoms() {
        let symptoms: Vec<String> = ["fever", " ", "cough", "chills", "headache", "nausea", "rash"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            symptom_query(&symptoms, "ignored"),
            "fever, cough, chills, headache, nausea"
        );
    }

    #[test]
    fn query_falls_back_to_note_prefix() {
        let note = "x".repeat(800);
        assert_eq!(symptom_query(&[], &note).len(), 500);
        assert!(symptom_query(&[], "   ").is_empty());
    }

    #[test]
    fn retrieval_keeps_diagnostic_passages_only() {
        let r = retriever(vec![
            passage(
                "PMC-1",
                "A 58-year-old man presented with crushing chest pain; troponin confirmed myocardial infarction.",
            ),
            passage("PMC-2", "Patient with chest pain was treated with aspirin and discharged."),
            passage("PMC-3", "Orthopedic follow-up for a wrist fracture."),
        ]);

        let evidence = r
            .retrieve(&["chest pain".to_string(), "sweating".to_string()], "")
            .unwrap();

        assert_eq!(evidence.retrieved, 3);
        assert_eq!(evidence.passages.len(), 1);
        assert_eq!(evidence.passages[0].case_id, "PMC-1");
        let quality = evidence.passages[0].quality.as_ref().unwrap();
        assert!(quality.is_diagnostic);
        assert_eq!(evidence.explanation, "1/3 chunks provide diagnostic value");
    }

    #[test]
    fn empty_store_yields_no_evidence() {
        let evidence = retriever(Vec::new())
            .retrieve(&["fever".to_string()], "")
            .unwrap();
        assert!(evidence.passages.is_empty());
        assert_eq!(evidence.explanation, "No diagnostic evidence found - results may be unreliable");
    }

    #[test]
    fn retrieval_disabled_without_qdrant_url() {
        let kb = KnowledgeBundle::bundled().unwrap().clinical_kb;
        let settings = Settings::from_lookup(|_| None);
        assert!(EvidenceRetriever::from_settings(&settings, &kb).unwrap().is_none());
    }
}
