//! Removes diagnoses that are impossible for this patient: wrong sex, wrong
//! age group, contradicted by a denied symptom, or ruled out by a lab.

use crate::models::{CandidateDiagnosis, ExtractedFindings, Sex};

const MALE_ONLY: &[&str] = &["prostat", "bph"];
const FEMALE_ONLY: &[&str] = &["pregnancy", "ectopic pregnancy", "ovarian", "endometriosis", "menstrual"];
const PEDIATRIC_ONLY: &[&str] = &["kawasaki disease", "croup"];
const ADULT_ONSET: &[&str] = &["presbycusis"];
const ACUTE_MI_NAMES: &[&str] = &["acute myocardial infarction", "acute mi"];

const ADULT_AGE: u32 = 18;
/// Troponin at or below this (ng/mL) is read as normal. Qualitative
/// "negative" results are stored as 0.0.
const TROPONIN_NORMAL_LIMIT: f64 = 0.04;

/// Reason `diagnosis` cannot apply to this patient, if any.
pub fn should_exclude(diagnosis: &str, findings: &ExtractedFindings) -> Option<String> {
    let dx = diagnosis.to_lowercase();

    match findings.demographics.sex {
        Some(Sex::Male) if FEMALE_ONLY.iter().any(|c| dx.contains(c)) => {
            return Some(format!("Patient is male, cannot have {diagnosis}"));
        }
        Some(Sex::Female) if MALE_ONLY.iter().any(|c| dx.contains(c)) => {
            return Some(format!("Patient is female, cannot have {diagnosis}"));
        }
        _ => {}
    }

    if let Some(age) = findings.demographics.age {
        let excluded = if age < ADULT_AGE { ADULT_ONSET } else { PEDIATRIC_ONLY };
        if excluded.iter().any(|c| dx.contains(c)) {
            return Some(format!("Patient age {age} incompatible with {diagnosis}"));
        }
    }

    if let Some(negated) = findings
        .negated_symptoms()
        .into_iter()
        .find(|n| !n.trim().is_empty() && dx.contains(n.trim()))
    {
        return Some(format!("Patient denies {negated}, contradicts {diagnosis}"));
    }

    let normal_troponin = findings
        .labs
        .troponin
        .is_some_and(|t| t <= TROPONIN_NORMAL_LIMIT);
    if normal_troponin && ACUTE_MI_NAMES.iter().any(|n| dx.contains(n)) {
        return Some("Normal troponin rules out acute MI".to_string());
    }

    None
}

/// Keep only candidates that survive [`should_exclude`]; each removal is logged.
pub fn filter_candidates(candidates: Vec<CandidateDiagnosis>, findings: &ExtractedFindings) -> Vec<CandidateDiagnosis> {
    candidates
        .into_iter()
        .filter(|c| match should_exclude(&c.name, findings) {
            Some(reason) => {
                tracing::info!(diagnosis = %c.name, %reason, "Excluding diagnosis");
                false
            }
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Demographics, EvidenceStrength, EvidenceType, LabValues, Negation, Provenance,
    };

    fn patient(age: Option<u32>, sex: Option<Sex>) -> ExtractedFindings {
        ExtractedFindings {
            demographics: Demographics { age, sex },
            ..Default::default()
        }
    }

    fn candidate(name: &str) -> CandidateDiagnosis {
        CandidateDiagnosis {
            name: name.into(),
            match_score: 0.5,
            matched_symptoms: Vec::new(),
            total_symptoms: 0,
            evidence_strength: EvidenceStrength::Weak,
            evidence_type: EvidenceType::SymptomMatch,
            provenance: Provenance::dataset("disease_symptoms"),
            severity: None,
            llm_reasoning: None,
        }
    }

    #[test]
    fn sex_exclusive_conditions() {
        let male = patient(Some(40), Some(Sex::Male));
        assert_eq!(
            should_exclude("Ovarian cyst", &male).as_deref(),
            Some("Patient is male, cannot have Ovarian cyst")
        );
        assert!(should_exclude("Ovarian cyst", &patient(Some(40), Some(Sex::Female))).is_none());
        assert!(should_exclude("Benign prostatic hyperplasia", &patient(None, Some(Sex::Female))).is_some());
        assert!(should_exclude("Ovarian cyst", &patient(None, None)).is_none());
    }

    #[test]
    fn age_restricted_conditions() {
        assert_eq!(
            should_exclude("Croup", &patient(Some(35), None)).as_deref(),
            Some("Patient age 35 incompatible with Croup")
        );
        assert!(should_exclude("Croup", &patient(Some(4), None)).is_none());
        assert!(should_exclude("Presbycusis", &patient(Some(12), None)).is_some());
        assert!(should_exclude("Presbycusis", &patient(Some(70), None)).is_none());
    }

    #[test]
    fn denied_symptom_in_name_excludes() {
        let findings = ExtractedFindings {
            negations: vec![Negation {
                base_symptom: "Migraine".into(),
                negation_type: "denied".into(),
                exact_phrase: "no history of migraine".into(),
            }],
            ..Default::default()
        };
        assert_eq!(
            should_exclude("Migraine", &findings).as_deref(),
            Some("Patient denies migraine, contradicts Migraine")
        );
        assert!(should_exclude("Heart attack", &findings).is_none());
    }

    #[test]
    fn normal_troponin_rules_out_acute_mi() {
        let findings = ExtractedFindings {
            labs: LabValues {
                troponin: Some(0.0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(should_exclude("Acute myocardial infarction", &findings).is_some());
        assert!(should_exclude("Unstable angina", &findings).is_none());

        let elevated = ExtractedFindings {
            labs: LabValues {
                troponin: Some(0.5),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(should_exclude("Acute myocardial infarction", &elevated).is_none());
    }

    #[test]
    fn filter_keeps_order_of_survivors() {
        let findings = patient(Some(52), Some(Sex::Male));
        let kept = filter_candidates(
            vec![candidate("Heart attack"), candidate("Ovarian cyst"), candidate("GERD")],
            &findings,
        );
        let names: Vec<&str> = kept.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Heart attack", "GERD"]);
    }
}
