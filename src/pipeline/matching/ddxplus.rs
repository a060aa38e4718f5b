use std::collections::BTreeSet;

use crate::knowledge::DdxPlus;
use crate::models::{CandidateDiagnosis, EvidenceStrength, EvidenceType, ExtractedFindings, Provenance};

pub const DDXPLUS_DATASET: &str = "ddxplus";

/// Score DDXPlus conditions by the share of their evidence the patient shows.
///
/// Raw score is 0-100: proportional overlap, a small bonus for three or more
/// independent matches, a penalty for thin (one or two) matches and 5 points
/// per denied symptom that a matched evidence question asks about. The
/// emitted `match_score` is the raw score divided by 100.
pub fn match_ddxplus(ddx: &DdxPlus, findings: &ExtractedFindings, top_k: usize) -> Vec<CandidateDiagnosis> {
    let symptoms = findings.symptom_names();
    if symptoms.is_empty() {
        tracing::warn!("No symptoms, skipping DDXPlus");
        return Vec::new();
    }

    // evidence id -> patient symptoms that mapped to it
    let mut patient: Vec<(String, String)> = Vec::new();
    for symptom in &symptoms {
        if let Some(evidence) = ddx.evidence_for_symptom(symptom) {
            tracing::debug!(symptom = %symptom, evidence = %evidence.id, "Mapped symptom to evidence");
            patient.push((evidence.id.clone(), symptom.clone()));
        }
    }
    if patient.is_empty() {
        tracing::info!("No symptoms matched DDXPlus evidences");
        return Vec::new();
    }
    let patient_ids: BTreeSet<&str> = patient.iter().map(|(id, _)| id.as_str()).collect();
    let negated = findings.negated_symptoms();

    let mut candidates: Vec<(f64, CandidateDiagnosis)> = Vec::new();
    for condition in ddx.conditions() {
        let matched: Vec<&str> = condition
            .evidence_ids
            .iter()
            .map(String::as_str)
            .filter(|id| patient_ids.contains(id))
            .collect();
        let score = overlap_score(ddx, matched.as_slice(), condition.evidence_ids.len(), &negated);
        if score <= 0.0 {
            continue;
        }

        let mut matched_symptoms: Vec<String> = Vec::new();
        for (id, symptom) in &patient {
            if matched.contains(&id.as_str()) && !matched_symptoms.contains(symptom) {
                matched_symptoms.push(symptom.clone());
            }
        }

        candidates.push((
            score,
            CandidateDiagnosis {
                name: condition.name.clone(),
                match_score: score / 100.0,
                matched_symptoms,
                total_symptoms: symptoms.len(),
                evidence_strength: strength(score),
                evidence_type: EvidenceType::StructuredMatch,
                provenance: Provenance::dataset(DDXPLUS_DATASET),
                severity: condition.severity,
                llm_reasoning: None,
            },
        ));
    }

    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    let candidates: Vec<CandidateDiagnosis> =
        candidates.into_iter().take(top_k).map(|(_, c)| c).collect();

    tracing::info!(
        evidences = patient_ids.len(),
        candidates = candidates.len(),
        "DDXPlus matching complete"
    );
    candidates
}

fn overlap_score(ddx: &DdxPlus, matched: &[&str], condition_total: usize, negated: &[String]) -> f64 {
    let count = matched.len();
    if count == 0 || condition_total == 0 {
        return 0.0;
    }

    let base = count as f64 / condition_total as f64 * 100.0;
    let bonus = if count >= 3 { (2 * count).min(10) as f64 } else { 0.0 };
    let thin = match count {
        1 => 15.0,
        2 => 5.0,
        _ => 0.0,
    };

    let mut contradictions = 0usize;
    for negation in negated {
        contradictions += matched
            .iter()
            .filter_map(|id| ddx.evidence(id))
            .filter(|e| e.question.contains(negation.as_str()))
            .count();
    }

    (base + bonus - thin - 5.0 * contradictions as f64).clamp(0.0, 100.0)
}

fn strength(score: f64) -> EvidenceStrength {
    if score >= 60.0 {
        EvidenceStrength::Strong
    } else if score >= 40.0 {
        EvidenceStrength::Moderate
    } else {
        EvidenceStrength::Weak
    }
}
