use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use super::KnowledgeError;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NegativeFeatures {
    pub features: Vec<String>,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct LikelihoodThresholds {
    pub very_likely: f64,
    pub likely: f64,
    pub possible: f64,
    pub unlikely: f64,
}

/// Curated symptom weights and contradicting features per disease.
#[derive(Debug, Clone, Deserialize)]
pub struct ClinicalKnowledgeBase {
    symptom_disease_weights: HashMap<String, HashMap<String, f64>>,
    #[serde(default)]
    negative_features: HashMap<String, NegativeFeatures>,
    pub likelihood_thresholds: LikelihoodThresholds,
    /// Category -> variable names, e.g. `"labs": ["troponin"]`.
    #[serde(default)]
    pub critical_variables: BTreeMap<String, Vec<String>>,
    /// Evidence type -> phrases that mark a passage as carrying it.
    #[serde(default)]
    pub evidence_keywords: BTreeMap<String, Vec<String>>,
}

impl ClinicalKnowledgeBase {
    pub fn parse(json: &str) -> Result<Self, KnowledgeError> {
        let kb: Self = serde_json::from_str(json).map_err(|source| KnowledgeError::Json {
            dataset: "clinical knowledge base",
            source,
        })?;
        if kb.symptom_disease_weights.is_empty() {
            return Err(KnowledgeError::Empty("clinical knowledge base"));
        }
        Ok(kb)
    }

    pub fn disease_count(&self) -> usize {
        self.symptom_disease_weights.len()
    }

    /// Feature weights for a disease; exact key first, then case-insensitive.
    pub fn weights(&self, disease: &str) -> Option<&HashMap<String, f64>> {
        lookup(&self.symptom_disease_weights, disease)
    }

    pub fn negative_features(&self, disease: &str) -> Option<&NegativeFeatures> {
        lookup(&self.negative_features, disease)
    }

    /// Every critical variable across categories, in category order.
    pub fn all_critical_variables(&self) -> impl Iterator<Item = &String> {
        self.critical_variables.values().flatten()
    }
}

fn lookup<'a, V>(map: &'a HashMap<String, V>, key: &str) -> Option<&'a V> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KB: &str = r#"{
        "symptom_disease_weights": {"GERD": {"heartburn": 3, "diaphoresis": -2}},
        "negative_features": {"GERD": {"features": ["diaphoresis"], "reasoning": "Autonomic"}},
        "likelihood_thresholds": {"very_likely": 7, "likely": 5, "possible": 3, "unlikely": 1},
        "critical_variables": {"vitals": ["heart_rate"], "labs": ["troponin", "d_dimer"]},
        "evidence_keywords": {"management": ["treated with"], "diagnostic_criteria": ["confirmed"]}
    }"#;

    #[test]
    fn lookup_is_case_insensitive_fallback() {
        let kb = ClinicalKnowledgeBase::parse(KB).unwrap();
        assert_eq!(kb.weights("gerd").unwrap()["heartburn"], 3.0);
        assert_eq!(kb.negative_features("Gerd").unwrap().reasoning, "Autonomic");
        assert!(kb.weights("Pneumonia").is_none());
        let types: Vec<&String> = kb.evidence_keywords.keys().collect();
        assert_eq!(types, ["diagnostic_criteria", "management"]);
    }

    #[test]
    fn critical_variables_flatten_in_category_order() {
        let kb = ClinicalKnowledgeBase::parse(KB).unwrap();
        let vars: Vec<&String> = kb.all_critical_variables().collect();
        assert_eq!(vars, ["troponin", "d_dimer", "heart_rate"]);
    }

    #[test]
    fn empty_weights_rejected() {
        let json = r#"{"symptom_disease_weights": {},
            "likelihood_thresholds": {"very_likely": 7, "likely": 5, "possible": 3, "unlikely": 1}}"#;
        assert!(matches!(
            ClinicalKnowledgeBase::parse(json).unwrap_err(),
            KnowledgeError::Empty(_)
        ));
    }
}
