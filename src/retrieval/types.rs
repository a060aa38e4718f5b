use serde::Serialize;

/// One retrieved case passage.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvidencePassage {
    pub case_id: String,
    pub source: String,
    pub text: String,
    /// Section label from the store payload ("diagnosis", "presentation", ...).
    pub section_type: Option<String>,
    /// Vector similarity reported by the store.
    pub similarity: f32,
    pub rerank_score: Option<f32>,
    /// Set once the quality filter has assessed the passage.
    pub quality: Option<EvidenceQuality>,
}

impl EvidencePassage {
    pub fn new(case_id: &str, source: &str, text: &str) -> Self {
        Self {
            case_id: case_id.to_string(),
            source: source.to_string(),
            text: text.to_string(),
            section_type: None,
            similarity: 0.0,
            rerank_score: None,
            quality: None,
        }
    }

    pub fn with_section(mut self, section_type: &str) -> Self {
        self.section_type = Some(section_type.to_string());
        self
    }

    pub fn with_similarity(mut self, similarity: f32) -> Self {
        self.similarity = similarity;
        self
    }
}

/// Whether a passage carries diagnostic information, and how much.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvidenceQuality {
    pub is_diagnostic: bool,
    pub evidence_types: Vec<String>,
    /// 0.0-1.0.
    pub score: f64,
    pub reason: String,
}

/// Output of one retrieval round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedEvidence {
    /// Diagnostic passages, best first.
    pub passages: Vec<EvidencePassage>,
    /// Candidates returned by the store before reranking and filtering.
    pub retrieved: usize,
    pub explanation: String,
}
