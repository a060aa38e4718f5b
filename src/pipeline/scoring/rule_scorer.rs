//! Deterministic clinical likelihood from curated symptom-disease weights.
//!
//! The output is an ordinal category, not a probability.

use serde::Serialize;

use crate::knowledge::ClinicalKnowledgeBase;
use crate::models::ExtractedFindings;
use crate::pipeline::normalize::normalize_feature;

/// Raw score used when the knowledge base has no weights for a diagnosis.
const UNKNOWN_DIAGNOSIS_SCORE: f64 = 3.0;
/// Missing critical variables beyond this are called out in the reasoning.
const MISSING_DATA_NOTE_THRESHOLD: usize = 5;
const MAX_SUPPORTING_IN_REASONING: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LikelihoodCategory {
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

impl LikelihoodCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryLikely => "Very Likely",
            Self::Likely => "Likely",
            Self::Possible => "Possible",
            Self::Unlikely => "Unlikely",
            Self::VeryUnlikely => "Very Unlikely",
        }
    }

    /// Upper-case form used in narrative output ("VERY LIKELY").
    pub fn headline(&self) -> String {
        self.label().to_uppercase()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RuleScore {
    pub category: LikelihoodCategory,
    pub raw_score: f64,
    pub supporting: Vec<String>,
    pub negatives_present: Vec<String>,
    pub missing_critical: Vec<String>,
    pub reasoning: String,
}

pub struct RuleScorer<'a> {
    kb: &'a ClinicalKnowledgeBase,
}

impl<'a> RuleScorer<'a> {
    pub fn new(kb: &'a ClinicalKnowledgeBase) -> Self {
        Self { kb }
    }

    /// Sum feature weights for `diagnosis`. Features with a positive weight
    /// are reported as supporting; each contradicting feature present costs
    /// one point on top of its weight.
    pub fn score(&self, diagnosis: &str, features: &[String], findings: &ExtractedFindings) -> RuleScore {
        let Some(weights) = self.kb.weights(diagnosis) else {
            tracing::debug!(diagnosis, "No rule weights, using default likelihood");
            return RuleScore {
                category: LikelihoodCategory::Possible,
                raw_score: UNKNOWN_DIAGNOSIS_SCORE,
                supporting: Vec::new(),
                negatives_present: Vec::new(),
                missing_critical: Vec::new(),
                reasoning: format!("{diagnosis} likelihood unknown (no scoring data available)."),
            };
        };

        let features: Vec<String> = features.iter().map(|f| normalize_feature(f)).collect();

        let mut raw_score = 0.0;
        let mut supporting = Vec::new();
        for feature in &features {
            if let Some(weight) = weights.get(feature) {
                raw_score += weight;
                if *weight > 0.0 {
                    supporting.push(feature.clone());
                }
            }
        }

        let mut negatives_present = Vec::new();
        if let Some(negative) = self.kb.negative_features(diagnosis) {
            for feature in &features {
                if negative.features.contains(feature) {
                    negatives_present.push(feature.clone());
                    raw_score -= 1.0;
                }
            }
        }

        let missing_critical = self.missing_critical(findings);
        let category = self.categorize(raw_score);
        let reasoning = self.reasoning(diagnosis, category, &supporting, &negatives_present, missing_critical.len());

        RuleScore {
            category,
            raw_score,
            supporting,
            negatives_present,
            missing_critical,
            reasoning,
        }
    }

    /// "Why not" text for a diagnosis whose contradicting features are present.
    /// Empty when nothing argues against it.
    pub fn negative_reasoning(&self, diagnosis: &str, features: &[String]) -> String {
        let Some(negative) = self.kb.negative_features(diagnosis) else {
            return String::new();
        };
        let features: Vec<String> = features.iter().map(|f| normalize_feature(f)).collect();
        if negative.features.iter().any(|f| features.contains(f)) {
            format!("{diagnosis} less likely because: {}", negative.reasoning)
        } else {
            String::new()
        }
    }

    /// Score every diagnosis and order by raw score, highest first.
    pub fn rank(
        &self,
        diagnoses: &[String],
        features: &[String],
        findings: &ExtractedFindings,
    ) -> Vec<(String, RuleScore)> {
        let mut ranked: Vec<(String, RuleScore)> = diagnoses
            .iter()
            .map(|dx| (dx.clone(), self.score(dx, features, findings)))
            .collect();
        ranked.sort_by(|a, b| b.1.raw_score.total_cmp(&a.1.raw_score));
        ranked
    }

    fn categorize(&self, score: f64) -> LikelihoodCategory {
        let t = &self.kb.likelihood_thresholds;
        if score >= t.very_likely {
            LikelihoodCategory::VeryLikely
        } else if score >= t.likely {
            LikelihoodCategory::Likely
        } else if score >= t.possible {
            LikelihoodCategory::Possible
        } else if score >= t.unlikely {
            LikelihoodCategory::Unlikely
        } else {
            LikelihoodCategory::VeryUnlikely
        }
    }

    fn missing_critical(&self, findings: &ExtractedFindings) -> Vec<String> {
        self.kb
            .all_critical_variables()
            .filter(|var| !is_recorded(var, findings))
            .cloned()
            .collect()
    }

    fn reasoning(
        &self,
        diagnosis: &str,
        category: LikelihoodCategory,
        supporting: &[String],
        negatives: &[String],
        missing: usize,
    ) -> String {
        let mut parts = vec![format!("{diagnosis} is {}.", category.label())];

        if !supporting.is_empty() {
            let top: Vec<&str> = supporting
                .iter()
                .take(MAX_SUPPORTING_IN_REASONING)
                .map(String::as_str)
                .collect();
            parts.push(format!("Supporting features: {}.", top.join(", ")));
        }

        if !negatives.is_empty() {
            if let Some(negative) = self.kb.negative_features(diagnosis) {
                parts.push(format!(
                    "However, {} present. {}.",
                    negatives.join(", "),
                    negative.reasoning
                ));
            }
        }

        if missing > MISSING_DATA_NOTE_THRESHOLD {
            parts.push(format!("Limited data: {missing} critical variables missing."));
        }

        parts.join(" ")
    }
}

/// Whether a critical variable (knowledge-base vocabulary) is documented.
fn is_recorded(variable: &str, findings: &ExtractedFindings) -> bool {
    let vitals = &findings.vital_signs;
    let labs = &findings.labs;
    match normalize_feature(variable).as_str() {
        "heart_rate" => vitals.heart_rate.is_some(),
        "blood_pressure" => vitals.systolic_bp.is_some(),
        "respiratory_rate" => vitals.respiratory_rate.is_some(),
        "temperature" => vitals.temperature.is_some(),
        "spo2" => vitals.spo2.is_some(),
        "troponin" => labs.troponin.is_some(),
        "d_dimer" => labs.d_dimer.is_some(),
        "bnp" => labs.bnp.is_some(),
        "wbc" => labs.wbc.is_some(),
        "duration" => {
            findings.temporal_pattern.is_some()
                || findings.atomic_symptoms.iter().any(|s| s.duration.is_some())
        }
        "onset" => {
            findings.temporal_pattern.is_some()
                || findings.atomic_symptoms.iter().any(|s| s.timing.is_some())
        }
        "ecg" => findings.physical_exam.iter().any(|e| {
            let e = e.to_lowercase();
            e.contains("ecg") || e.contains("ekg")
        }),
        other => {
            let needle = other.replace('_', " ");
            findings
                .physical_exam
                .iter()
                .chain(findings.past_medical_history.iter())
                .any(|e| e.to_lowercase().contains(&needle))
        }
    }
}
