use std::collections::HashSet;

use super::types::EvidencePassage;
use crate::models::EvidenceCitation;

pub const MAX_CITATIONS_PER_DIAGNOSIS: usize = 2;
const EXCERPT_CHARS: usize = 150;

/// Hands out passages as citations so that no case backs more than one
/// diagnosis.
#[derive(Debug, Default)]
pub struct CitationAllocator {
    used: HashSet<String>,
}

impl CitationAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Up to two not-yet-cited passages, in the order given.
    pub fn allocate(&mut self, passages: &[EvidencePassage]) -> Vec<EvidenceCitation> {
        let mut citations = Vec::new();
        for passage in passages {
            if citations.len() == MAX_CITATIONS_PER_DIAGNOSIS {
                break;
            }
            if !self.used.insert(passage.case_id.clone()) {
                continue;
            }
            citations.push(EvidenceCitation {
                case_id: passage.case_id.clone(),
                source: passage.source.clone(),
                excerpt: passage.text.chars().take(EXCERPT_CHARS).collect(),
                similarity: f64::from(passage.similarity),
            });
        }
        citations
    }
}
