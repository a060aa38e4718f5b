//! Ordinal labels and lexicographic ranking. No calibrated probabilities
//! are implied by anything here.

use crate::models::{CandidateDiagnosis, DiagnosisSource};

/// Integer 0-10 rule score derived from a candidate's match score.
pub fn rule_score(candidate: &CandidateDiagnosis) -> u32 {
    (candidate.match_score.clamp(0.0, 1.0) * 10.0).round() as u32
}

/// Source-specific plausibility label.
///
/// Rule candidates are banded by rule score, evidence candidates by how many
/// high-quality sources back them; LLM hypotheses are never more than
/// possible.
pub fn classify_plausibility(candidate: &CandidateDiagnosis, high_quality_sources: usize) -> &'static str {
    match candidate.provenance.source {
        DiagnosisSource::Rule => match rule_score(candidate) {
            7.. => "VERY LIKELY",
            5..=6 => "LIKELY",
            3..=4 => "POSSIBLE",
            _ => "UNLIKELY",
        },
        DiagnosisSource::Evidence => match high_quality_sources {
            3.. => "LIKELY",
            1..=2 => "POSSIBLE",
            _ => "INSUFFICIENT",
        },
        DiagnosisSource::Llm => "POSSIBLE",
    }
}

/// Order rule-sourced candidates first (by rule score), then evidence-sourced
/// ones (by citation count), then LLM hypotheses. The sort is stable, so
/// ties keep their incoming order.
pub fn rank_diagnoses<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> (&CandidateDiagnosis, usize),
{
    items.sort_by_key(|item| {
        let (candidate, evidence_count) = key(item);
        let source = candidate.provenance.source;
        std::cmp::Reverse((
            source == DiagnosisSource::Rule,
            if source == DiagnosisSource::Rule { rule_score(candidate) } else { 0 },
            source == DiagnosisSource::Evidence,
            evidence_count,
        ))
    });
}

pub fn evidence_support(count: usize) -> &'static str {
    match count {
        0 => "NONE",
        1 => "SINGLE SOURCE",
        2 => "LIMITED",
        _ => "MULTIPLE SOURCES",
    }
}

/// Completeness-based uncertainty, not a statistical variance.
pub fn uncertainty_level(missing: usize, expected: usize) -> &'static str {
    if missing == 0 {
        "LOW"
    } else if missing < expected {
        "MODERATE"
    } else {
        "HIGH"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EvidenceStrength, EvidenceType, Provenance};

    fn candidate(name: &str, score: f64, provenance: Provenance) -> CandidateDiagnosis {
        CandidateDiagnosis {
            name: name.into(),
            match_score: score,
            matched_symptoms: Vec::new(),
            total_symptoms: 0,
            evidence_strength: EvidenceStrength::Weak,
            evidence_type: EvidenceType::SymptomMatch,
            provenance,
            severity: None,
            llm_reasoning: None,
        }
    }

    fn evidence() -> Provenance {
        Provenance {
            source: DiagnosisSource::Evidence,
            rule_applied: false,
            llm_used: false,
            dataset: None,
        }
    }

    #[test]
    fn rule_plausibility_bands() {
        let rule = |s| candidate("x", s, Provenance::dataset("ddxplus"));
        assert_eq!(classify_plausibility(&rule(0.95), 0), "VERY LIKELY");
        assert_eq!(classify_plausibility(&rule(0.56), 0), "LIKELY");
        assert_eq!(classify_plausibility(&rule(0.3), 0), "POSSIBLE");
        assert_eq!(classify_plausibility(&rule(0.2), 0), "UNLIKELY");
    }

    #[test]
    fn evidence_and_llm_plausibility() {
        let ev = candidate("x", 0.9, evidence());
        assert_eq!(classify_plausibility(&ev, 3), "LIKELY");
        assert_eq!(classify_plausibility(&ev, 1), "POSSIBLE");
        assert_eq!(classify_plausibility(&ev, 0), "INSUFFICIENT");
        assert_eq!(classify_plausibility(&candidate("x", 0.99, Provenance::llm()), 5), "POSSIBLE");
    }

    #[test]
    fn ranking_is_lexicographic_by_source() {
        let mut items = vec![
            (candidate("llm", 0.9, Provenance::llm()), 4),
            (candidate("evidence-few", 0.9, evidence()), 1),
            (candidate("rule-low", 0.3, Provenance::dataset("csv")), 0),
            (candidate("evidence-many", 0.1, evidence()), 3),
            (candidate("rule-high", 0.8, Provenance::dataset("csv")), 0),
        ];
        rank_diagnoses(&mut items, |(c, n)| (c, *n));
        let names: Vec<&str> = items.iter().map(|(c, _)| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["rule-high", "rule-low", "evidence-many", "evidence-few", "llm"]
        );
    }

    #[test]
    fn support_and_uncertainty_labels() {
        assert_eq!(evidence_support(0), "NONE");
        assert_eq!(evidence_support(1), "SINGLE SOURCE");
        assert_eq!(evidence_support(2), "LIMITED");
        assert_eq!(evidence_support(7), "MULTIPLE SOURCES");
        assert_eq!(uncertainty_level(0, 6), "LOW");
        assert_eq!(uncertainty_level(2, 6), "MODERATE");
        assert_eq!(uncertainty_level(6, 6), "HIGH");
    }
}
