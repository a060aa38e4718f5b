//! Canonical symptom strings and patient-level GI/cardiac pattern signals.

use serde::Serialize;

use crate::models::ExtractedFindings;

// ═══════════════════════════════════════════════════════════
// Lexical normalization
// ═══════════════════════════════════════════════════════════

/// Map an extracted base symptom onto the vocabulary used by the symptom
/// datasets. Returns `None` for blank input.
pub fn normalize_base_symptom(raw: &str) -> Option<String> {
    let base = raw.trim().to_lowercase();
    if base.is_empty() || base == "null" {
        return None;
    }

    let mapped = match base.as_str() {
        "taste disturbance" | "acid taste" | "acidic taste" | "sour taste in mouth" => "sour taste",
        "diaphoresis" => "sweating",
        "dyspnea" | "dyspnoea" | "sob" => "shortness of breath",
        "eructation" | "belch" => "belching",
        "constitutional symptoms" | "general malaise" | "malaise" => "fatigue",
        "thoracic discomfort" | "thoracic pain" => "chest pain",
        "visceral pain" | "visceral discomfort" => "abdominal pain",
        _ if base.contains("chest") && (base.contains("discomfort") || !base.contains("pain")) => {
            "chest pain"
        }
        _ => return Some(base),
    };
    Some(mapped.to_string())
}

/// Negations use a smaller vocabulary map than positive symptoms.
pub fn normalize_negated_symptom(raw: &str) -> Option<String> {
    let base = raw.trim().to_lowercase();
    if base.is_empty() || base == "null" {
        return None;
    }
    Some(match base.as_str() {
        "diaphoresis" => "sweating".to_string(),
        "dyspnea" | "dyspnoea" | "sob" => "shortness of breath".to_string(),
        _ => base,
    })
}

/// Knowledge-base feature key: lowercase with spaces and hyphens as `_`.
pub fn normalize_feature(feature: &str) -> String {
    feature.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Absent modifiers arrive as `None`, "" or the literal "null".
fn present(modifier: &Option<String>) -> Option<&str> {
    modifier
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty() && !m.eq_ignore_ascii_case("null"))
}

/// Promote modifiers into matchable symptom strings:
/// `chest pain` + quality `burning` gives `burning chest pain` alongside the base.
pub fn canonical_symptoms(findings: &ExtractedFindings) -> Vec<String> {
    let mut canonical = Vec::new();

    for symptom in &findings.atomic_symptoms {
        let base = symptom.base_symptom.trim();
        if base.is_empty() {
            continue;
        }
        canonical.push(base.to_string());
        if let Some(quality) = present(&symptom.quality) {
            canonical.push(format!("{quality} {base}"));
        }
        if let Some(location) = present(&symptom.location) {
            canonical.push(format!("{location} {base}"));
        }
        if let Some(radiation) = present(&symptom.radiation) {
            canonical.push(format!("{base} radiating to {radiation}"));
        }
    }
    canonical.extend(findings.associated_symptoms.iter().cloned());

    let mut seen = std::collections::HashSet::new();
    canonical
        .into_iter()
        .filter(|s| {
            let key = s.trim().to_lowercase();
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════
// Pattern detection
// ═══════════════════════════════════════════════════════════

/// Patient-level boosts computed once and applied per candidate disease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PatternScores {
    pub gi: i32,
    pub cardiac: i32,
}

const GI_TRIGGERS: &[&str] = &["meal", "eating", "food", "lying", "bending"];
const CARDIAC_TRIGGERS: &[&str] = &["exertion", "exercise", "stress", "activity"];

pub fn detect_patterns(findings: &ExtractedFindings) -> PatternScores {
    let mut scores = PatternScores::default();

    for symptom in &findings.atomic_symptoms {
        let base = symptom.base_symptom.to_lowercase();
        if !(base.contains("chest") || base.contains("abdominal") || base.contains("epigastric")) {
            continue;
        }
        let quality = symptom.quality.as_deref().unwrap_or_default().to_lowercase();
        let location = symptom.location.as_deref().unwrap_or_default().to_lowercase();

        if quality.contains("burning") {
            scores.gi += 20;
            scores.cardiac -= 15;
        } else if ["pressure", "crushing", "squeezing"]
            .iter()
            .any(|q| quality.contains(q))
        {
            scores.cardiac += 15;
            scores.gi -= 10;
        }

        if location.contains("epigastric") || location.contains("substernal") {
            scores.gi += 10;
        }
        if location.contains("central") || location.contains("left") {
            scores.cardiac += 10;
        }
    }

    let triggers = findings
        .triggers
        .iter()
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    if GI_TRIGGERS.iter().any(|w| triggers.contains(w)) {
        scores.gi += 15;
        scores.cardiac -= 10;
    }
    if CARDIAC_TRIGGERS.iter().any(|w| triggers.contains(w)) {
        scores.cardiac += 15;
        scores.gi -= 5;
    }

    tracing::debug!(gi = scores.gi, cardiac = scores.cardiac, "Clinical patterns detected");
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AtomicSymptom;

    fn burning_chest_pain() -> AtomicSymptom {
        AtomicSymptom {
            base_symptom: "chest pain".into(),
            quality: Some("burning".into()),
            location: Some("substernal".into()),
            radiation: Some("null".into()),
            ..Default::default()
        }
    }

    #[test]
    fn base_symptom_vocabulary() {
        assert_eq!(normalize_base_symptom("Chest discomfort").as_deref(), Some("chest pain"));
        assert_eq!(normalize_base_symptom("chest tightness").as_deref(), Some("chest pain"));
        assert_eq!(normalize_base_symptom("chest pain").as_deref(), Some("chest pain"));
        assert_eq!(normalize_base_symptom("Acidic taste").as_deref(), Some("sour taste"));
        assert_eq!(normalize_base_symptom("eructation").as_deref(), Some("belching"));
        assert_eq!(normalize_base_symptom("visceral pain").as_deref(), Some("abdominal pain"));
        assert_eq!(normalize_base_symptom("general malaise").as_deref(), Some("fatigue"));
        assert_eq!(normalize_base_symptom("Cough").as_deref(), Some("cough"));
        assert_eq!(normalize_base_symptom("  "), None);
        assert_eq!(normalize_base_symptom("null"), None);
    }

    #[test]
    fn negated_vocabulary() {
        assert_eq!(normalize_negated_symptom("Diaphoresis").as_deref(), Some("sweating"));
        assert_eq!(normalize_negated_symptom("dyspnea").as_deref(), Some("shortness of breath"));
        assert_eq!(normalize_negated_symptom("fever").as_deref(), Some("fever"));
        assert_eq!(normalize_negated_symptom(""), None);
    }

    #[test]
    fn feature_keys() {
        assert_eq!(normalize_feature("Burning chest-pain"), "burning_chest_pain");
    }

    #[test]
    fn canonical_promotes_modifiers_and_dedupes() {
        let findings = ExtractedFindings {
            atomic_symptoms: vec![
                burning_chest_pain(),
                AtomicSymptom {
                    base_symptom: "arm pain".into(),
                    radiation: Some("left arm".into()),
                    ..Default::default()
                },
            ],
            associated_symptoms: vec!["Nausea".into(), "chest pain".into()],
            ..Default::default()
        };
        assert_eq!(
            canonical_symptoms(&findings),
            vec![
                "chest pain",
                "burning chest pain",
                "substernal chest pain",
                "arm pain",
                "arm pain radiating to left arm",
                "Nausea",
            ]
        );
    }

    #[test]
    fn burning_substernal_meal_pattern_is_gi() {
        let findings = ExtractedFindings {
            atomic_symptoms: vec![burning_chest_pain()],
            triggers: vec!["large meals".into(), "lying flat".into()],
            ..Default::default()
        };
        assert_eq!(detect_patterns(&findings), PatternScores { gi: 45, cardiac: -25 });
    }

    #[test]
    fn pressure_on_exertion_is_cardiac() {
        let findings = ExtractedFindings {
            atomic_symptoms: vec![AtomicSymptom {
                base_symptom: "chest pain".into(),
                quality: Some("crushing".into()),
                location: Some("central".into()),
                ..Default::default()
            }],
            triggers: vec!["exertion".into()],
            ..Default::default()
        };
        assert_eq!(detect_patterns(&findings), PatternScores { gi: -15, cardiac: 40 });
    }

    #[test]
    fn non_truncal_symptoms_do_not_contribute() {
        let findings = ExtractedFindings {
            atomic_symptoms: vec![AtomicSymptom {
                base_symptom: "headache".into(),
                quality: Some("burning".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(detect_patterns(&findings), PatternScores::default());
    }
}
