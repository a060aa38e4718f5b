use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use super::KnowledgeError;

/// A DDXPlus pathology and the evidence codes that characterize it.
#[derive(Debug, Clone, PartialEq)]
pub struct DdxCondition {
    pub key: String,
    pub name: String,
    pub severity: Option<u8>,
    pub evidence_ids: Vec<String>,
}

/// A DDXPlus evidence question; `question` is lowercased for matching.
#[derive(Debug, Clone, PartialEq)]
pub struct DdxEvidence {
    pub id: String,
    pub question: String,
}

#[derive(Debug, Clone, Default)]
pub struct DdxPlus {
    conditions: Vec<DdxCondition>,
    /// Ordered by id so symptom lookup is deterministic.
    evidences: BTreeMap<String, DdxEvidence>,
}

#[derive(Deserialize)]
struct RawCondition {
    #[serde(rename = "cond-name-eng")]
    name_eng: Option<String>,
    condition_name: Option<String>,
    severity: Option<u8>,
    #[serde(default)]
    symptoms: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct RawEvidence {
    question_en: Option<String>,
}

impl DdxPlus {
    pub fn parse(conditions_json: &str, evidences_json: &str) -> Result<Self, KnowledgeError> {
        let raw_conditions: BTreeMap<String, RawCondition> =
            serde_json::from_str(conditions_json).map_err(|source| KnowledgeError::Json {
                dataset: "ddxplus conditions",
                source,
            })?;
        let raw_evidences: BTreeMap<String, RawEvidence> =
            serde_json::from_str(evidences_json).map_err(|source| KnowledgeError::Json {
                dataset: "ddxplus evidences",
                source,
            })?;

        let conditions = raw_conditions
            .into_iter()
            .filter(|(_, c)| !c.symptoms.is_empty())
            .map(|(key, c)| {
                let mut evidence_ids: Vec<String> = c.symptoms.into_keys().collect();
                evidence_ids.sort();
                DdxCondition {
                    name: c.name_eng.or(c.condition_name).unwrap_or_else(|| key.clone()),
                    key,
                    severity: c.severity,
                    evidence_ids,
                }
            })
            .collect::<Vec<_>>();

        let evidences = raw_evidences
            .into_iter()
            .filter_map(|(id, e)| {
                e.question_en.map(|q| {
                    (
                        id.clone(),
                        DdxEvidence {
                            id,
                            question: q.to_lowercase(),
                        },
                    )
                })
            })
            .collect::<BTreeMap<_, _>>();

        if conditions.is_empty() {
            return Err(KnowledgeError::Empty("ddxplus conditions"));
        }

        Ok(Self {
            conditions,
            evidences,
        })
    }

    pub fn conditions(&self) -> &[DdxCondition] {
        &self.conditions
    }

    pub fn evidence(&self, id: &str) -> Option<&DdxEvidence> {
        self.evidences.get(id)
    }

    pub fn evidence_count(&self) -> usize {
        self.evidences.len()
    }

    /// First evidence whose question mentions the symptom, or failing that
    /// any of its words of four letters or more.
    pub fn evidence_for_symptom(&self, symptom: &str) -> Option<&DdxEvidence> {
        let symptom = symptom.trim().to_lowercase();
        if symptom.is_empty() {
            return None;
        }
        if let Some(e) = self.evidences.values().find(|e| e.question.contains(&symptom)) {
            return Some(e);
        }
        let words: Vec<&str> = symptom.split_whitespace().filter(|w| w.len() >= 4).collect();
        self.evidences
            .values()
            .find(|e| words.iter().any(|w| e.question.contains(w)))
    }
}
