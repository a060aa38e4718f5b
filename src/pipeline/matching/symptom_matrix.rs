use std::collections::HashSet;

use crate::knowledge::SymptomMatrix;
use crate::models::{CandidateDiagnosis, EvidenceStrength, EvidenceType, ExtractedFindings, Provenance};
use crate::pipeline::expansion::{expand_all_for_dataset, expand_for_dataset};
use crate::pipeline::normalize::PatternScores;

pub const SYMPTOM_MATRIX_DATASET: &str = "disease_symptoms";

const POINTS_PER_MATCH: i32 = 10;

const GI_TERMS: &[&str] = &[
    "gerd", "reflux", "esophag", "gastro", "peptic", "ulcer", "hiatal", "dyspepsia",
];
const CARDIAC_TERMS: &[&str] = &[
    "cardiac", "heart", "coronary", "infarction", "angina", "ischemic", "atherosclerosis",
];

/// Denied symptoms that argue against a cardiac cause, 20 points each.
const CARDIAC_NEGATIONS: &[&str] = &[
    "diaphoresis",
    "sweating",
    "radiation",
    "radiating",
    "shortness of breath",
    "sob",
    "dyspnea",
    "nausea",
];
/// Denied symptoms that argue against a GI cause, 10 points each.
const GI_NEGATIONS: &[&str] = &["heartburn", "regurgitation", "sour taste", "belching"];

#[derive(Debug)]
struct DiseaseBest {
    disease: String,
    score: i32,
    matched: Vec<String>,
}

/// Score every disease row against the patient's canonical symptoms.
///
/// Each canonical symptom is widened to its controlled column variants and
/// compared to column headers by exact equality. A disease with several
/// rows keeps its strictly best-scoring row.
pub fn match_symptom_matrix(
    matrix: &SymptomMatrix,
    findings: &ExtractedFindings,
    canonical: &[String],
    patterns: PatternScores,
    top_k: usize,
) -> Vec<CandidateDiagnosis> {
    if canonical.is_empty() {
        tracing::warn!("No canonical symptoms, skipping symptom matrix");
        return Vec::new();
    }

    let matched_columns: HashSet<String> = expand_all_for_dataset(canonical)
        .into_iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| matrix.has_column(v))
        .collect();
    if matched_columns.is_empty() {
        tracing::info!(canonical = canonical.len(), "No symptom matrix columns matched");
        return Vec::new();
    }

    let negation_text = findings.negation_text();
    let mut best: Vec<DiseaseBest> = Vec::new();

    for row in matrix.patterns() {
        let score = row_score(&row.disease, &row.symptoms, &matched_columns, patterns, &negation_text);
        let slot = match best.iter().position(|b| b.disease == row.disease) {
            Some(i) => i,
            None => {
                best.push(DiseaseBest {
                    disease: row.disease.clone(),
                    score: 0,
                    matched: Vec::new(),
                });
                best.len() - 1
            }
        };
        if score > best[slot].score {
            best[slot].score = score;
            best[slot].matched = contributing_symptoms(canonical, &matched_columns, &row.symptoms);
        }
    }

    best.retain(|b| b.score > 0);
    best.sort_by(|a, b| (b.score, b.matched.len()).cmp(&(a.score, a.matched.len())));

    let candidates: Vec<CandidateDiagnosis> = best
        .into_iter()
        .take(top_k)
        .map(|b| CandidateDiagnosis {
            evidence_strength: strength(b.score, b.matched.len()),
            name: b.disease,
            match_score: f64::from(b.score) / 100.0,
            matched_symptoms: b.matched,
            total_symptoms: canonical.len(),
            evidence_type: EvidenceType::SymptomMatch,
            provenance: Provenance::dataset(SYMPTOM_MATRIX_DATASET),
            severity: None,
            llm_reasoning: None,
        })
        .collect();

    tracing::info!(
        columns = matched_columns.len(),
        candidates = candidates.len(),
        gi = patterns.gi,
        cardiac = patterns.cardiac,
        "Symptom matrix matching complete"
    );
    candidates
}

fn row_score(
    disease: &str,
    row_symptoms: &[String],
    matched_columns: &HashSet<String>,
    patterns: PatternScores,
    negation_text: &str,
) -> i32 {
    let matches = row_symptoms
        .iter()
        .filter(|s| matched_columns.contains(s.as_str()))
        .count() as i32;
    if matches == 0 {
        return 0;
    }

    let name = disease.to_lowercase();
    let gi = GI_TERMS.iter().any(|t| name.contains(t));
    let cardiac = CARDIAC_TERMS.iter().any(|t| name.contains(t));

    let mut score = POINTS_PER_MATCH * matches;
    if gi {
        score += patterns.gi;
    } else if cardiac {
        score += patterns.cardiac;
    }
    if cardiac {
        score -= 20 * occurrences(CARDIAC_NEGATIONS, negation_text);
    }
    if gi {
        score -= 10 * occurrences(GI_NEGATIONS, negation_text);
    }
    score.clamp(0, 100)
}

fn occurrences(terms: &[&str], haystack: &str) -> i32 {
    terms.iter().filter(|t| haystack.contains(*t)).count() as i32
}

/// Canonical symptoms (not column names) that hit a column present in the row.
fn contributing_symptoms(
    canonical: &[String],
    matched_columns: &HashSet<String>,
    row_symptoms: &[String],
) -> Vec<String> {
    canonical
        .iter()
        .filter(|symptom| {
            expand_for_dataset(symptom).iter().any(|variant| {
                let variant = variant.trim().to_lowercase();
                matched_columns.contains(&variant) && row_symptoms.contains(&variant)
            })
        })
        .cloned()
        .collect()
}

fn strength(score: i32, matched: usize) -> EvidenceStrength {
    if score >= 60 && matched >= 4 {
        EvidenceStrength::Strong
    } else if score >= 40 && matched >= 2 {
        EvidenceStrength::Moderate
    } else {
        EvidenceStrength::Weak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeBundle;
    use crate::models::{AtomicSymptom, Negation};
    use crate::pipeline::normalize::{canonical_symptoms, detect_patterns};

    fn negation(base: &str) -> Negation {
        Negation {
            base_symptom: base.into(),
            negation_type: "denied".into(),
            exact_phrase: String::new(),
        }
    }

    fn run(findings: &ExtractedFindings) -> Vec<CandidateDiagnosis> {
        let bundle = KnowledgeBundle::bundled().unwrap();
        let canonical = canonical_symptoms(findings);
        match_symptom_matrix(
            &bundle.symptom_matrix,
            findings,
            &canonical,
            detect_patterns(findings),
            10,
        )
    }

    fn reflux_findings() -> ExtractedFindings {
        ExtractedFindings {
            atomic_symptoms: vec![
                AtomicSymptom {
                    base_symptom: "chest pain".into(),
                    quality: Some("burning".into()),
                    location: Some("substernal".into()),
                    ..Default::default()
                },
                AtomicSymptom::named("sour taste"),
                AtomicSymptom::named("belching"),
            ],
            associated_symptoms: vec!["nausea".into()],
            triggers: vec!["meals".into(), "lying down".into()],
            negations: vec![
                negation("shortness of breath"),
                negation("sweating"),
                negation("radiation"),
            ],
            ..Default::default()
        }
    }

    fn cardiac_findings() -> ExtractedFindings {
        ExtractedFindings {
            atomic_symptoms: vec![AtomicSymptom {
                base_symptom: "chest pain".into(),
                quality: Some("crushing".into()),
                location: Some("central".into()),
                radiation: Some("left arm".into()),
                ..Default::default()
            }],
            associated_symptoms: vec![
                "sweating".into(),
                "shortness of breath".into(),
                "nausea".into(),
            ],
            triggers: vec!["exertion".into()],
            ..Default::default()
        }
    }

    #[test]
    fn reflux_pattern_ranks_gerd_first() {
        let candidates = run(&reflux_findings());
        let top = &candidates[0];
        assert_eq!(top.name, "gastroesophageal reflux disease");
        assert!((top.match_score - 0.95).abs() < 1e-9);
        assert_eq!(top.evidence_strength, EvidenceStrength::Strong);
        assert_eq!(
            top.matched_symptoms,
            vec!["chest pain", "burning chest pain", "sour taste", "belching", "nausea"]
        );
        assert_eq!(top.evidence_type, EvidenceType::SymptomMatch);
        assert_eq!(top.provenance.dataset.as_deref(), Some(SYMPTOM_MATRIX_DATASET));

        assert_eq!(candidates[1].name, "peptic ulcer disease");
        assert!((candidates[1].match_score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn cardiac_negations_remove_cardiac_diseases() {
        let candidates = run(&reflux_findings());
        assert!(candidates.iter().all(|c| c.name != "heart attack"));
        assert!(candidates.iter().all(|c| c.name != "angina"));
    }

    #[test]
    fn exertional_pressure_ranks_heart_attack_first() {
        let candidates = run(&cardiac_findings());
        let top = &candidates[0];
        assert_eq!(top.name, "heart attack");
        assert!((top.match_score - 0.8).abs() < 1e-9);
        assert_eq!(top.match_count(), 4);
        assert_eq!(top.evidence_strength, EvidenceStrength::Strong);

        // Same score, fewer contributing symptoms
        assert_eq!(candidates[1].name, "coronary atherosclerosis");
        assert_eq!(candidates[1].match_count(), 3);

        let angina = candidates.iter().find(|c| c.name == "angina").unwrap();
        assert_eq!(angina.evidence_strength, EvidenceStrength::Moderate);
    }

    #[test]
    fn each_disease_appears_once() {
        let candidates = run(&cardiac_findings());
        let mut names: Vec<_> = candidates.iter().map(|c| c.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), candidates.len());
    }

    #[test]
    fn unknown_symptoms_yield_nothing() {
        let findings = ExtractedFindings {
            atomic_symptoms: vec![AtomicSymptom::named("itchy elbow")],
            ..Default::default()
        };
        assert!(run(&findings).is_empty());
        assert!(run(&ExtractedFindings::default()).is_empty());
    }

    #[test]
    fn top_k_truncates() {
        let bundle = KnowledgeBundle::bundled().unwrap();
        let findings = cardiac_findings();
        let canonical = canonical_symptoms(&findings);
        let candidates = match_symptom_matrix(
            &bundle.symptom_matrix,
            &findings,
            &canonical,
            detect_patterns(&findings),
            2,
        );
        assert_eq!(candidates.len(), 2);
    }
}
