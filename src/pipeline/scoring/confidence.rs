//! Point confidence with a compound uncertainty interval.

use std::collections::HashSet;

use crate::models::{CandidateDiagnosis, ConfidenceScore, EvidenceCitation, EvidenceType, ExtractedFindings};

/// Citations needed for full evidence coverage.
const IDEAL_CITATIONS: f64 = 5.0;
const MAX_UNCERTAINTY: f64 = 0.6;
const BASELINE_UNCERTAINTY: f64 = 0.1;
/// Vital and lab slots considered when judging completeness.
const EXPECTED_VITALS: usize = 5;
const EXPECTED_LABS: usize = 3;

/// Confidence from the candidate's origin, before any uncertainty.
pub fn base_confidence(candidate: &CandidateDiagnosis) -> f64 {
    match candidate.evidence_type {
        EvidenceType::CaseBased => 0.7,
        t if t.is_symptom_match() => candidate.match_score,
        EvidenceType::LlmGenerated => 0.5,
        EvidenceType::RuleBasedFallback => 0.3,
        _ => 0.5,
    }
}

/// Uncertainty components compound as `1 - Π(1 - u)` rather than averaging,
/// capped at 0.6. With no component present a 0.1 baseline applies.
pub fn score_confidence(
    candidate: &CandidateDiagnosis,
    citations: &[EvidenceCitation],
    findings: &ExtractedFindings,
    reasoning_consistency: f64,
) -> ConfidenceScore {
    let belief = base_confidence(candidate).clamp(0.0, 1.0);
    let mut components: Vec<f64> = Vec::new();
    let mut sources: Vec<String> = Vec::new();

    if (citations.len() as f64 / IDEAL_CITATIONS) < 0.6 {
        components.push(0.3);
        sources.push("Limited evidence (< 3 sources)".to_string());
    }

    let contradicting = citations
        .iter()
        .filter(|c| c.excerpt.to_lowercase().contains("not"))
        .count();
    let contradiction_rate = contradicting as f64 / citations.len().max(1) as f64;
    if contradiction_rate > 0.2 {
        components.push(contradiction_rate);
        sources.push(format!("Contradictory evidence ({:.0}%)", contradiction_rate * 100.0));
    }

    let distinct: HashSet<&str> = citations.iter().map(|c| c.source.as_str()).collect();
    if distinct.len() < 2 {
        components.push(0.2);
        sources.push("Single dataset only".to_string());
    }

    let missing_vitals = EXPECTED_VITALS.saturating_sub(findings.vital_signs.recorded_count());
    let missing_labs = EXPECTED_LABS.saturating_sub(findings.labs.recorded_count());
    let incompleteness = (missing_vitals + missing_labs) as f64 / (EXPECTED_VITALS + EXPECTED_LABS) as f64;
    if incompleteness > 0.5 {
        components.push(incompleteness * 0.3);
        sources.push(format!("Missing key data ({:.0}% incomplete)", incompleteness * 100.0));
    }

    let uncertainty = if components.is_empty() {
        BASELINE_UNCERTAINTY
    } else {
        (1.0 - components.iter().map(|u| 1.0 - u).product::<f64>()).min(MAX_UNCERTAINTY)
    };

    ConfidenceScore {
        point_estimate: round3(belief),
        lower_bound: round3((belief - uncertainty).max(0.0)),
        upper_bound: round3((belief + uncertainty).min(1.0)),
        uncertainty_sources: sources,
        reasoning_consistency: round3(reasoning_consistency),
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EvidenceStrength, LabValues, Provenance, VitalSigns};

    fn candidate(evidence_type: EvidenceType, score: f64) -> CandidateDiagnosis {
        CandidateDiagnosis {
            name: "Pneumonia".into(),
            match_score: score,
            matched_symptoms: Vec::new(),
            total_symptoms: 0,
            evidence_strength: EvidenceStrength::Moderate,
            evidence_type,
            provenance: Provenance::dataset("ddxplus"),
            severity: None,
            llm_reasoning: None,
        }
    }

    fn citation(source: &str, excerpt: &str) -> EvidenceCitation {
        EvidenceCitation {
            case_id: format!("{source}-{excerpt}"),
            source: source.into(),
            excerpt: excerpt.into(),
            similarity: 0.8,
        }
    }

    fn complete_findings() -> ExtractedFindings {
        ExtractedFindings {
            vital_signs: VitalSigns {
                heart_rate: Some(110.0),
                systolic_bp: Some(120.0),
                diastolic_bp: Some(80.0),
                respiratory_rate: Some(22.0),
                temperature: Some(38.9),
                spo2: Some(93.0),
            },
            labs: LabValues {
                troponin: Some(0.0),
                d_dimer: Some(0.2),
                wbc: Some(14.0),
                bnp: None,
            },
            ..Default::default()
        }
    }

    #[test]
    fn base_confidence_by_evidence_type() {
        assert!((base_confidence(&candidate(EvidenceType::CaseBased, 0.1)) - 0.7).abs() < 1e-9);
        assert!((base_confidence(&candidate(EvidenceType::SymptomMatch, 0.82)) - 0.82).abs() < 1e-9);
        assert!((base_confidence(&candidate(EvidenceType::StructuredMatch, 0.44)) - 0.44).abs() < 1e-9);
        assert!((base_confidence(&candidate(EvidenceType::LlmGenerated, 0.9)) - 0.5).abs() < 1e-9);
        assert!((base_confidence(&candidate(EvidenceType::RuleBasedFallback, 0.9)) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn no_evidence_and_no_data_compounds() {
        let c = score_confidence(
            &candidate(EvidenceType::SymptomMatch, 0.5),
            &[],
            &ExtractedFindings::default(),
            1.0,
        );
        // 1 - (0.7 * 0.8 * 0.7) = 0.608, capped at 0.6
        assert!((c.lower_bound - 0.0).abs() < 1e-9);
        assert!((c.upper_bound - 1.0).abs() < 1e-9);
        assert_eq!(c.uncertainty_sources.len(), 3);
        assert_eq!(c.uncertainty_sources[0], "Limited evidence (< 3 sources)");
        assert_eq!(c.uncertainty_sources[1], "Single dataset only");
        assert_eq!(c.uncertainty_sources[2], "Missing key data (100% incomplete)");
    }

    #[test]
    fn well_supported_candidate_gets_baseline_band() {
        let citations = vec![
            citation("open-patients", "fever and productive cough"),
            citation("open-patients", "lobar consolidation"),
            citation("statpearls", "community acquired pneumonia"),
        ];
        let c = score_confidence(
            &candidate(EvidenceType::StructuredMatch, 0.6),
            &citations,
            &complete_findings(),
            0.8,
        );
        assert!(c.uncertainty_sources.is_empty());
        assert!((c.point_estimate - 0.6).abs() < 1e-9);
        assert!((c.lower_bound - 0.5).abs() < 1e-9);
        assert!((c.upper_bound - 0.7).abs() < 1e-9);
        assert!((c.reasoning_consistency - 0.8).abs() < 1e-9);
    }

    #[test]
    fn contradicting_passages_add_their_rate() {
        let citations = vec![
            citation("open-patients", "pain was not pleuritic"),
            citation("statpearls", "typical presentation"),
            citation("statpearls", "fever"),
        ];
        let c = score_confidence(
            &candidate(EvidenceType::SymptomMatch, 0.6),
            &citations,
            &complete_findings(),
            1.0,
        );
        assert_eq!(c.uncertainty_sources, vec!["Contradictory evidence (33%)"]);
        // uncertainty = 1/3
        assert!((c.lower_bound - 0.267).abs() < 1e-9);
        assert!((c.upper_bound - 0.933).abs() < 1e-9);
    }
}
