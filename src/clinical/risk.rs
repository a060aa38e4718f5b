//! Diagnosis-specific risk stratification.
//!
//! Chest-pain and coronary diagnoses use the HEART score, pulmonary embolism
//! uses Wells, everything else a danger-weighted heuristic in which
//! confidence never lowers risk.

use serde::{Deserialize, Serialize};

use super::contains_word;
use crate::knowledge::DangerPriors;
use crate::models::{ExtractedFindings, RiskAssessment, RiskLevel, RiskMethod};

const HEART_TERMS: &[&str] = &[
    "ACUTE CORONARY",
    "MYOCARDIAL INFARCTION",
    "CHEST PAIN",
    "HEART ATTACK",
    "UNSTABLE ANGINA",
];
const HEART_WORDS: &[&str] = &["ACS", "NSTEMI", "STEMI"];

const CRITICAL_CONDITIONS: &[&str] = &[
    "ACS",
    "STROKE",
    "SEPSIS",
    "ANAPHYLAXIS",
    "ACUTE MI",
    "MYOCARDIAL INFARCTION",
    "HEART ATTACK",
    "PULMONARY EMBOLISM",
    "AORTIC DISSECTION",
];

const ALTERED_MENTAL_STATUS: &[&str] = &["confusion", "altered", "unresponsive", "lethargic"];
const DVT_SIGNS: &[&str] = &["leg swelling", "calf tenderness", "edema"];

/// Wells PE above this is high probability.
const WELLS_HIGH: f64 = 6.0;
const WELLS_MODERATE: f64 = 2.0;

const DANGER_WEIGHT: f64 = 0.5;
const SEVERITY_WEIGHT: f64 = 0.3;
const MISSING_DATA_WEIGHT: f64 = 0.2;
const MAX_PATIENT_SEVERITY: f64 = 10.0;
const MAX_MISSING_PENALTY: f64 = 5.0;

pub struct RiskCalculator<'a> {
    priors: &'a DangerPriors,
}

impl<'a> RiskCalculator<'a> {
    pub fn new(priors: &'a DangerPriors) -> Self {
        Self { priors }
    }

    /// Route `diagnosis` to its calculator. `confidence` only matters for
    /// Wells, where PE being the leading diagnosis scores points.
    pub fn assess(&self, diagnosis: &str, findings: &ExtractedFindings, confidence: f64) -> RiskAssessment {
        let dx = diagnosis.to_uppercase();
        let assessment = if uses_heart_score(&dx) {
            heart_score(findings)
        } else if dx.contains("PULMONARY EMBOLISM") || contains_word(&dx, "PE") {
            wells_pe(findings, confidence)
        } else {
            self.danger_weighted(diagnosis, findings)
        };
        tracing::debug!(
            diagnosis,
            method = ?assessment.method,
            score = assessment.score,
            level = assessment.level.label(),
            "Risk assessed"
        );
        assessment
    }

    fn danger_weighted(&self, diagnosis: &str, findings: &ExtractedFindings) -> RiskAssessment {
        let danger = self.priors.danger_score(diagnosis);
        let severity = patient_severity(findings);
        let missing = missing_data_penalty(findings);
        let score = round2(danger * DANGER_WEIGHT + severity * SEVERITY_WEIGHT + missing * MISSING_DATA_WEIGHT);
        let level = RiskLevel::from_score(score);

        RiskAssessment {
            level,
            label: level.label().to_string(),
            score,
            method: RiskMethod::DangerWeighted,
            components: vec![
                format!("Danger if missed: {danger}"),
                format!("Patient severity: {severity}"),
                format!("Missing data penalty: {missing}"),
            ],
        }
    }
}

fn uses_heart_score(dx: &str) -> bool {
    HEART_TERMS.iter().any(|t| dx.contains(t)) || HEART_WORDS.iter().any(|w| contains_word(dx, w))
}

/// HEART score, 0-10. ECG is not interpreted and always scores 1; an absent
/// troponin also scores 1.
fn heart_score(findings: &ExtractedFindings) -> RiskAssessment {
    let mut components = Vec::new();

    let chest_complaint = findings.has_symptom("chest pain")
        || findings.atomic_symptoms.iter().any(|s| {
            s.quality
                .as_deref()
                .is_some_and(|q| q.contains("pressure") || q.contains("tightness"))
        });
    let high_suspicion = findings.atomic_symptoms.iter().any(|s| s.radiation.is_some())
        || ["sweating", "diaphoresis", "nausea"]
            .iter()
            .any(|s| findings.has_symptom(s));
    let history = match (chest_complaint, high_suspicion) {
        (true, true) => 2,
        (true, false) => 1,
        (false, _) => 0,
    };
    components.push(format!("History: {history}"));

    let age = match findings.demographics.age {
        Some(a) if a >= 65 => Some(2),
        Some(a) if a >= 45 => Some(1),
        Some(_) => Some(0),
        None => None,
    };
    if let Some(points) = age {
        components.push(format!("Age: {points}"));
    }

    let factor_count = ["hypertension", "diabetes", "smok"]
        .iter()
        .filter(|rf| findings.has_risk_factor(rf))
        .count();
    let risk_factors = match factor_count {
        3.. => 2,
        1..=2 => 1,
        _ => 0,
    };
    components.push(format!("Risk factors: {risk_factors}"));

    let ecg = 1;
    components.push(format!("ECG: {ecg}"));

    let troponin = match findings.labs.troponin {
        Some(t) if t > 0.1 => 2,
        Some(t) if t > 0.0 => 1,
        Some(_) => 0,
        None => 1,
    };
    components.push(format!("Troponin: {troponin}"));

    let score = f64::from(history + age.unwrap_or(0) + risk_factors + ecg + troponin);
    let level = RiskLevel::from_score(score);
    RiskAssessment {
        level,
        label: level.label().to_string(),
        score,
        method: RiskMethod::HeartScore,
        components,
    }
}

fn wells_pe(findings: &ExtractedFindings, confidence: f64) -> RiskAssessment {
    let mut score = 0.0;
    let mut components = Vec::new();
    let mut add = |points: f64, label: &str| {
        score += points;
        components.push(format!("{label}: {points}"));
    };

    let exam = findings.physical_exam.join(" ").to_lowercase();
    if DVT_SIGNS
        .iter()
        .any(|sign| exam.contains(sign) || findings.has_symptom(sign))
    {
        add(3.0, "Clinical signs of DVT");
    }
    if confidence > 0.7 {
        add(3.0, "PE most likely diagnosis");
    }
    if findings.vital_signs.heart_rate.is_some_and(|hr| hr > 100.0) {
        add(1.5, "Heart rate > 100");
    }
    if ["surgery", "immobiliz"].iter().any(|rf| findings.has_risk_factor(rf)) {
        add(1.5, "Recent surgery or immobilization");
    }
    if ["pulmonary embolism", "dvt", "deep vein thrombosis"]
        .iter()
        .any(|rf| findings.has_risk_factor(rf))
    {
        add(1.5, "Previous PE or DVT");
    }
    if ["hemoptysis", "coughing up blood", "coughing blood"]
        .iter()
        .any(|s| findings.has_symptom(s))
    {
        add(1.0, "Hemoptysis");
    }
    if ["cancer", "malignancy"].iter().any(|rf| findings.has_risk_factor(rf)) {
        add(1.0, "Malignancy");
    }

    let level = if score > WELLS_HIGH {
        RiskLevel::Red
    } else if score >= WELLS_MODERATE {
        RiskLevel::Orange
    } else {
        RiskLevel::Blue
    };
    RiskAssessment {
        level,
        label: level.label().to_string(),
        score,
        method: RiskMethod::WellsPe,
        components,
    }
}

/// How sick the patient is right now, 0-10, from vitals and mental status.
pub fn patient_severity(findings: &ExtractedFindings) -> f64 {
    let vitals = &findings.vital_signs;
    let mut severity = 0.0;
    if vitals.spo2.is_some_and(|v| v < 90.0) {
        severity += 3.0;
    }
    if vitals.heart_rate.is_some_and(|v| v > 120.0) {
        severity += 2.0;
    }
    if vitals.systolic_bp.is_some_and(|v| v < 90.0) {
        severity += 3.0;
    }
    if ALTERED_MENTAL_STATUS.iter().any(|t| findings.has_symptom(t)) {
        severity += 4.0;
    }
    f64::min(severity, MAX_PATIENT_SEVERITY)
}

/// Missing data counts against the patient: 0.5 per absent core vital and
/// 2 for chest pain without a troponin, capped at 5.
pub fn missing_data_penalty(findings: &ExtractedFindings) -> f64 {
    let mut penalty = findings.vital_signs.missing().len() as f64 * 0.5;
    if findings.has_symptom("chest pain") && findings.labs.troponin.is_none() {
        penalty += 2.0;
    }
    f64::min(penalty, MAX_MISSING_PENALTY)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ═══════════════════════════════════════════════════════════
// Safety classification
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SafetyCategory {
    Critical,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SafetyClassification {
    pub category: SafetyCategory,
    pub description: &'static str,
    pub triggered_rules: Vec<String>,
}

/// Categorical safety class from named rules only; no scores involved.
/// A critical condition in the diagnosis name, or among the triggered
/// rules, makes it critical.
pub fn classify_safety(diagnosis: &str, triggered_rules: &[String]) -> SafetyClassification {
    let dx = diagnosis.to_uppercase();
    let is_critical_rule = |rule: &String| {
        let rule = rule.to_uppercase().replace('_', " ");
        CRITICAL_CONDITIONS.iter().any(|c| rule == *c)
    };
    let critical_name = CRITICAL_CONDITIONS.iter().any(|c| contains_word(&dx, c));
    let critical_rules: Vec<String> = triggered_rules
        .iter()
        .filter(|r| is_critical_rule(*r))
        .cloned()
        .collect();

    if critical_name || !critical_rules.is_empty() {
        let triggered_rules = if critical_rules.is_empty() {
            vec![diagnosis.to_string()]
        } else {
            critical_rules
        };
        return SafetyClassification {
            category: SafetyCategory::Critical,
            description: "Life-threatening condition if delayed",
            triggered_rules,
        };
    }

    if !triggered_rules.is_empty() {
        return SafetyClassification {
            category: SafetyCategory::Moderate,
            description: "Non-critical safety considerations identified",
            triggered_rules: triggered_rules.to_vec(),
        };
    }

    SafetyClassification {
        category: SafetyCategory::Low,
        description: "No acute safety concerns identified",
        triggered_rules: Vec::new(),
    }
}
