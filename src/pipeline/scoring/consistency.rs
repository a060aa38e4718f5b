//! Grounding check for diagnosis reasoning text.

use crate::models::EvidenceCitation;

const CLINICAL_TERMS: &[&str] = &[
    "pain",
    "fever",
    "cough",
    "nausea",
    "vomiting",
    "diarrhea",
    "headache",
    "dizziness",
    "fatigue",
    "weakness",
    "shortness of breath",
    "dyspnea",
    "chest pain",
    "abdominal pain",
    "back pain",
    "chills",
    "sweating",
    "confusion",
    "altered mental status",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyCheck {
    pub score: f64,
    pub issues: Vec<String>,
    pub novel_terms: usize,
}

/// Penalize reasoning that introduces symptoms the patient does not have
/// (soft, `exp(-0.5 n)`), names a diagnosis absent from its citations, or
/// rests on citations that mostly do not mention the diagnosis.
pub fn reasoning_consistency(
    diagnosis: &str,
    reasoning: &str,
    citations: &[EvidenceCitation],
    patient_symptoms: &[String],
) -> ConsistencyCheck {
    let reasoning = reasoning.to_lowercase();
    let dx = diagnosis.trim().to_lowercase();
    let patient: Vec<String> = patient_symptoms.iter().map(|s| s.to_lowercase()).collect();
    let mut score = 1.0;
    let mut issues = Vec::new();

    let novel_terms = CLINICAL_TERMS
        .iter()
        .filter(|term| reasoning.contains(*term))
        .filter(|term| !patient.iter().any(|s| s.contains(*term)))
        .count();
    if novel_terms > 0 {
        score *= (-0.5 * novel_terms as f64).exp();
        issues.push(format!(
            "Reasoning introduces {novel_terms} symptoms not in patient data"
        ));
    }

    let evidence_text = citations
        .iter()
        .map(|c| c.excerpt.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    if !dx.is_empty() && reasoning.contains(&dx) && !evidence_text.contains(&dx) {
        score *= 0.7;
        issues.push("Diagnosis name not found in cited evidence".to_string());
    }

    let supporting = citations
        .iter()
        .filter(|c| c.excerpt.to_lowercase().contains(&dx))
        .count();
    if !citations.is_empty() && (supporting as f64 / citations.len() as f64) < 0.5 {
        score *= 0.8;
        issues.push(format!(
            "Only {supporting}/{} evidence chunks mention diagnosis",
            citations.len()
        ));
    }

    if !issues.is_empty() {
        tracing::debug!(diagnosis, score, issues = ?issues, "Reasoning consistency issues");
    }

    ConsistencyCheck {
        score: score.max(0.0),
        issues,
        novel_terms,
    }
}
