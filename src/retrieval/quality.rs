//! Keeps passages that carry diagnostic information, not merely similar text.

use std::collections::BTreeMap;

use super::types::{EvidencePassage, EvidenceQuality};
use crate::knowledge::ClinicalKnowledgeBase;

const DIAGNOSTIC_TYPES: &[&str] = &["diagnostic_criteria", "typical_symptoms", "exclusion_features"];
const DIAGNOSTIC_SECTIONS: &[&str] = &["diagnostic", "evaluation", "presentation", "clinical"];
const SECTION_BONUS: f64 = 0.2;
const OTHER_TYPE_WEIGHT: f64 = 0.1;

fn type_weight(evidence_type: &str) -> f64 {
    match evidence_type {
        "diagnostic_criteria" => 1.0,
        "typical_symptoms" => 0.9,
        "exclusion_features" => 0.8,
        "management" => 0.3,
        _ => OTHER_TYPE_WEIGHT,
    }
}

#[derive(Debug, Clone)]
pub struct EvidenceQualityFilter {
    keywords: BTreeMap<String, Vec<String>>,
}

impl EvidenceQualityFilter {
    /// `keywords` maps an evidence type to the phrases that signal it.
    pub fn new(keywords: BTreeMap<String, Vec<String>>) -> Self {
        let keywords = keywords
            .into_iter()
            .map(|(t, kws)| (t, kws.into_iter().map(|k| k.to_lowercase()).collect()))
            .collect();
        Self { keywords }
    }

    pub fn from_knowledge_base(kb: &ClinicalKnowledgeBase) -> Self {
        Self::new(kb.evidence_keywords.clone())
    }

    pub fn assess(&self, text: &str, section_type: Option<&str>) -> EvidenceQuality {
        let text = text.to_lowercase();
        let section = section_type.unwrap_or_default().to_lowercase();

        let mut evidence_types: Vec<String> = self
            .keywords
            .iter()
            .filter(|(_, kws)| kws.iter().any(|k| text.contains(k.as_str())))
            .map(|(t, _)| t.clone())
            .collect();

        let diagnostic_section = section.contains("diagnostic") || section.contains("evaluation");
        if diagnostic_section && !evidence_types.iter().any(|t| t == "diagnostic_criteria") {
            evidence_types.push("diagnostic_criteria".to_string());
        }
        // Most diagnostic first; the sort is stable so equal weights keep name order.
        evidence_types.sort_by(|a, b| type_weight(b).total_cmp(&type_weight(a)));

        let is_diagnostic = evidence_types
            .iter()
            .any(|t| DIAGNOSTIC_TYPES.contains(&t.as_str()));

        let mut score: f64 = evidence_types.iter().map(|t| type_weight(t)).sum();
        if DIAGNOSTIC_SECTIONS.iter().any(|s| section.contains(s)) {
            score += SECTION_BONUS;
        }

        let reason = if is_diagnostic {
            let lead: Vec<&str> = evidence_types.iter().take(2).map(String::as_str).collect();
            format!("Contains {} information", lead.join(", "))
        } else {
            "No diagnostic criteria found - management/background only".to_string()
        };

        EvidenceQuality {
            is_diagnostic,
            evidence_types,
            score: score.min(1.0),
            reason,
        }
    }

    /// Keep diagnostic passages scoring at least `min_score`, attaching
    /// their assessment.
    pub fn filter(&self, passages: Vec<EvidencePassage>, min_score: f64) -> Vec<EvidencePassage> {
        passages
            .into_iter()
            .filter_map(|mut passage| {
                let quality = self.assess(&passage.text, passage.section_type.as_deref());
                if quality.is_diagnostic && quality.score >= min_score {
                    tracing::debug!(case_id = %passage.case_id, score = quality.score, reason = %quality.reason, "Kept passage");
                    passage.quality = Some(quality);
                    Some(passage)
                } else {
                    tracing::debug!(case_id = %passage.case_id, reason = %quality.reason, "Dropped passage");
                    None
                }
            })
            .collect()
    }

    pub fn explain(original: usize, kept: usize) -> String {
        if kept == 0 {
            return "No diagnostic evidence found - results may be unreliable".to_string();
        }
        let kept_pct = if original > 0 {
            kept as f64 / original as f64 * 100.0
        } else {
            0.0
        };
        if kept_pct < 30.0 {
            format!("Only {kept}/{original} chunks contain diagnostic criteria")
        } else {
            format!("{kept}/{original} chunks provide diagnostic value")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> EvidenceQualityFilter {
        let mut keywords = BTreeMap::new();
        keywords.insert("diagnostic_criteria".to_string(), vec!["Troponin".to_string(), "confirmed".to_string()]);
        keywords.insert("typical_symptoms".to_string(), vec!["presented with".to_string()]);
        keywords.insert("exclusion_features".to_string(), vec!["ruled out".to_string()]);
        keywords.insert("management".to_string(), vec!["treated with".to_string()]);
        EvidenceQualityFilter::new(keywords)
    }

    #[test]
    fn diagnostic_passage_scores_high() {
        let q = filter().assess("She presented with chest pain; TROPONIN was elevated.", None);
        assert!(q.is_diagnostic);
        assert_eq!(q.evidence_types, vec!["diagnostic_criteria", "typical_symptoms"]);
        assert!((q.score - 1.0).abs() < 1e-9);
        assert_eq!(q.reason, "Contains diagnostic_criteria, typical_symptoms information");
    }

    #[test]
    fn management_only_is_not_diagnostic() {
        let q = filter().assess("He was treated with aspirin.", Some("clinical course"));
        assert!(!q.is_diagnostic);
        // 0.3 + section bonus
        assert!((q.score - 0.5).abs() < 1e-9);
        assert_eq!(q.reason, "No diagnostic criteria found - management/background only");
    }

    #[test]
    fn evaluation_section_implies_criteria() {
        let q = filter().assess("Workup details.", Some("Evaluation"));
        assert_eq!(q.evidence_types, vec!["diagnostic_criteria"]);
        assert!((q.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn exclusion_alone_passes_threshold() {
        let f = filter();
        let passages = vec![
            EvidencePassage::new("a", "open-patients", "Pulmonary embolism was ruled out."),
            EvidencePassage::new("b", "open-patients", "Treated with antibiotics."),
        ];
        let kept = f.filter(passages, 0.6);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].case_id, "a");
        assert!((kept[0].quality.as_ref().unwrap().score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn explanation_bands() {
        assert_eq!(
            EvidenceQualityFilter::explain(5, 0),
            "No diagnostic evidence found - results may be unreliable"
        );
        assert_eq!(
            EvidenceQualityFilter::explain(10, 2),
            "Only 2/10 chunks contain diagnostic criteria"
        );
        assert_eq!(
            EvidenceQualityFilter::explain(5, 3),
            "3/5 chunks provide diagnostic value"
        );
    }
}
