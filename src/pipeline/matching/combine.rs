use std::collections::HashMap;

use crate::models::CandidateDiagnosis;

/// A structured match above this makes thin symptom-matrix matches suspect.
const STRUCTURED_CONFIDENT: f64 = 0.5;

/// Collapse candidates sharing a (case-insensitive) name, keeping the higher
/// score. First-seen order is preserved.
pub fn dedupe_by_name(candidates: Vec<CandidateDiagnosis>) -> Vec<CandidateDiagnosis> {
    let before = candidates.len();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<CandidateDiagnosis> = Vec::new();

    for candidate in candidates {
        let key = candidate.name.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        match index.get(&key) {
            Some(&i) => {
                if candidate.match_score > unique[i].match_score {
                    unique[i] = candidate;
                }
            }
            None => {
                index.insert(key, unique.len());
                unique.push(candidate);
            }
        }
    }

    if unique.len() < before {
        tracing::debug!(before, after = unique.len(), "Removed duplicate diagnoses");
    }
    unique
}

/// Merge structured and symptom-matrix candidates into one ranking.
///
/// When the structured matcher is confident, symptom-matrix candidates
/// resting on few symptoms are scaled down (x0.4 for two or fewer, x0.7 for
/// three) before merging. The merged list is sorted by score, descending,
/// and deduplicated by name keeping the higher score.
pub fn combine_candidates(
    structured: Vec<CandidateDiagnosis>,
    mut symptom_matrix: Vec<CandidateDiagnosis>,
) -> Vec<CandidateDiagnosis> {
    let structured_max = structured
        .iter()
        .map(|c| c.match_score)
        .fold(0.0_f64, f64::max);

    if structured_max > STRUCTURED_CONFIDENT {
        tracing::info!(structured_max, "Structured matches are confident, downweighting thin matrix matches");
        for candidate in symptom_matrix.iter_mut() {
            let factor = match candidate.match_count() {
                0..=2 => 0.4,
                3 => 0.7,
                _ => continue,
            };
            candidate.match_score *= factor;
        }
    }

    let mut all: Vec<CandidateDiagnosis> = structured.into_iter().chain(symptom_matrix).collect();
    all.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
    dedupe_by_name(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EvidenceStrength, EvidenceType, Provenance};

    fn candidate(name: &str, score: f64, matched: usize, evidence_type: EvidenceType) -> CandidateDiagnosis {
        CandidateDiagnosis {
            name: name.into(),
            match_score: score,
            matched_symptoms: (0..matched).map(|i| format!("s{i}")).collect(),
            total_symptoms: 6,
            evidence_strength: EvidenceStrength::Moderate,
            evidence_type,
            provenance: Provenance::dataset("test"),
            severity: None,
            llm_reasoning: None,
        }
    }

    #[test]
    fn dedupe_keeps_higher_score() {
        let out = dedupe_by_name(vec![
            candidate("GERD", 0.4, 2, EvidenceType::StructuredMatch),
            candidate("Angina", 0.3, 2, EvidenceType::SymptomMatch),
            candidate("gerd ", 0.7, 5, EvidenceType::SymptomMatch),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "gerd ");
        assert!((out[0].match_score - 0.7).abs() < 1e-9);
        assert_eq!(out[1].name, "Angina");
    }

    #[test]
    fn confident_structured_match_downweights_thin_matrix_matches() {
        let out = combine_candidates(
            vec![candidate("GERD", 0.56, 3, EvidenceType::StructuredMatch)],
            vec![
                candidate("peptic ulcer disease", 0.75, 4, EvidenceType::SymptomMatch),
                candidate("angina", 0.7, 3, EvidenceType::SymptomMatch),
                candidate("migraine", 0.5, 1, EvidenceType::SymptomMatch),
            ],
        );
        let score = |name: &str| out.iter().find(|c| c.name == name).unwrap().match_score;
        assert!((score("peptic ulcer disease") - 0.75).abs() < 1e-9);
        assert!((score("angina") - 0.49).abs() < 1e-9);
        assert!((score("migraine") - 0.2).abs() < 1e-9);
        assert_eq!(out[0].name, "peptic ulcer disease");
        assert_eq!(out[1].name, "GERD");
    }

    #[test]
    fn weak_structured_match_leaves_matrix_scores() {
        let out = combine_candidates(
            vec![candidate("GERD", 0.5, 2, EvidenceType::StructuredMatch)],
            vec![candidate("migraine", 0.3, 1, EvidenceType::SymptomMatch)],
        );
        assert!((out[1].match_score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn shared_name_keeps_confident_structured_match() {
        let out = combine_candidates(
            vec![candidate("Angina", 0.55, 3, EvidenceType::StructuredMatch)],
            vec![
                candidate("angina", 0.6, 2, EvidenceType::SymptomMatch),
                candidate("migraine", 0.5, 1, EvidenceType::SymptomMatch),
            ],
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "Angina");
        assert_eq!(out[0].evidence_type, EvidenceType::StructuredMatch);
        assert!((out[0].match_score - 0.55).abs() < 1e-9);
        assert_eq!(out[1].name, "migraine");
        assert!((out[1].match_score - 0.2).abs() < 1e-9);
    }
}
