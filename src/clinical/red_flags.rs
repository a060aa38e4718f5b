//! Critical findings that need immediate attention. The LLM reads the note
//! and leading diagnoses; rules take over when it is absent or fails.

use std::fmt::Write;

use serde_json::Value;

use super::contains_word;
use crate::llm::LlmHandle;
use crate::models::{DifferentialDiagnosis, FlagSeverity, RedFlag, RiskLevel, VitalSigns};
use crate::pipeline::extraction::extract_json_block;

pub const MAX_RED_FLAGS: usize = 5;
const MAX_KEYWORDS: usize = 5;
const MAX_TEXT_KEYWORDS: usize = 3;
const NOTE_CONTEXT_CHARS: usize = 1500;
const MAX_PROMPT_SYMPTOMS: usize = 15;
const DIAGNOSES_CONSIDERED: usize = 3;
/// Minimum point confidence before a high-risk diagnosis raises a flag.
const DIAGNOSIS_FLAG_CONFIDENCE: f64 = 0.6;

const TEXT_KEYWORDS: &[&str] = &[
    "chest pain",
    "dyspnea",
    "hypoxemia",
    "hypotension",
    "tachycardia",
    "hemoptysis",
    "syncope",
    "confusion",
];

const RED_FLAG_SYSTEM_PROMPT: &str = "\
You are a clinical safety assistant. Identify only critical red flags that are \
clearly present in the data and need immediate action. Be specific, never \
generic. Return only a JSON array.";

/// Red flags for the analysed note, at most [`MAX_RED_FLAGS`].
pub fn detect_red_flags(
    llm: Option<&LlmHandle>,
    note: &str,
    diagnoses: &[DifferentialDiagnosis],
    symptoms: &[String],
    vitals: &VitalSigns,
) -> Vec<RedFlag> {
    let Some(llm) = llm else {
        return fallback_red_flags(diagnoses, symptoms, vitals);
    };

    let prompt = build_red_flag_prompt(note, diagnoses, symptoms, vitals);
    match llm.complete(&prompt, RED_FLAG_SYSTEM_PROMPT) {
        Ok(response) => {
            let flags = parse_red_flags(&response);
            tracing::info!(count = flags.len(), "Red flags detected");
            flags
        }
        Err(e) => {
            tracing::warn!(error = %e, "Red flag detection failed, using rules");
            fallback_red_flags(diagnoses, symptoms, vitals)
        }
    }
}

fn build_red_flag_prompt(
    note: &str,
    diagnoses: &[DifferentialDiagnosis],
    symptoms: &[String],
    vitals: &VitalSigns,
) -> String {
    let excerpt: String = note.chars().take(NOTE_CONTEXT_CHARS).collect();
    let mut prompt = format!("CLINICAL NOTE (truncated)\n-------------------------\n{excerpt}\n\nTOP DIAGNOSES\n-------------\n");
    for (i, dx) in diagnoses.iter().take(DIAGNOSES_CONSIDERED).enumerate() {
        let _ = writeln!(
            prompt,
            "{}. {} (confidence {:.0}%, risk {})",
            i + 1,
            dx.diagnosis,
            dx.confidence.point_estimate * 100.0,
            dx.risk_label
        );
    }

    let listed: Vec<&str> = symptoms.iter().take(MAX_PROMPT_SYMPTOMS).map(String::as_str).collect();
    let _ = write!(prompt, "\nKEY SYMPTOMS\n------------\n{}\n", listed.join(", "));

    if vitals.recorded_count() > 0 {
        if let Ok(json) = serde_json::to_string_pretty(vitals) {
            let _ = write!(prompt, "\nVITAL SIGNS\n-----------\n{json}\n");
        }
    }

    prompt.push_str(
        r#"
RED FLAG CRITERIA
-----------------
Life-threatening: ACS/MI, aortic dissection, pulmonary embolism, stroke/TIA,
sepsis, anaphylaxis, SpO2 < 90%, shock.
Cardiac: chest pain with radiation, diaphoresis or dyspnea; ST elevation;
SBP > 180 or < 90.
Respiratory: dyspnea at rest, respiratory distress, hemoptysis.
Neurological: altered mental status, thunderclap headache, focal deficits, syncope.
Other: severe abdominal pain, GI bleeding, fever with confusion, HR > 120.

OUTPUT (STRICT JSON)
--------------------
[
  {"flag": "Severe chest pain with radiation to left arm", "severity": "critical" | "warning",
   "keywords": ["chest pain", "radiation", "left arm"]}
]
Keywords must be phrases copied from the note (2-5 per flag). At most 5 flags.
Return [] when no red flag is present."#,
    );
    prompt
}

/// Parse the model reply. Invalid entries are dropped; a reply that is not
/// JSON at all is read line by line.
pub fn parse_red_flags(response: &str) -> Vec<RedFlag> {
    let array_first = match (response.find('['), response.find('{')) {
        (Some(a), Some(o)) => a < o,
        (Some(_), None) => true,
        _ => false,
    };
    let block = if array_first {
        extract_json_block(response, '[', ']')
    } else {
        extract_json_block(response, '{', '}')
    };

    match block.and_then(|json| serde_json::from_str::<Value>(json).ok()) {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(flag_from_value)
            .take(MAX_RED_FLAGS)
            .collect(),
        Some(object @ Value::Object(_)) => flag_from_value(object).into_iter().collect(),
        _ => {
            tracing::warn!("Red flag reply was not JSON, reading it as text");
            flags_from_text(response)
        }
    }
}

fn flag_from_value(value: Value) -> Option<RedFlag> {
    let Value::Object(map) = value else {
        return None;
    };
    let flag = match map.get("flag")? {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if flag.is_empty() {
        return None;
    }
    let severity = map
        .get("severity")
        .and_then(Value::as_str)
        .map(|s| match s.trim().to_lowercase().as_str() {
            "critical" => FlagSeverity::Critical,
            "info" => FlagSeverity::Info,
            _ => FlagSeverity::Warning,
        })
        .unwrap_or(FlagSeverity::Warning);
    let keywords = match map.get("keywords") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|k| match k {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .take(MAX_KEYWORDS)
            .collect(),
        _ => Vec::new(),
    };
    Some(RedFlag {
        flag,
        severity,
        keywords,
    })
}

fn flags_from_text(text: &str) -> Vec<RedFlag> {
    text.lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim())
        .filter(|line| line.chars().count() > 10)
        .map(|line| {
            let lower = line.to_lowercase();
            let critical = ["critical", "life-threatening", "emergency", "🚨"]
                .iter()
                .any(|w| lower.contains(w));
            RedFlag {
                flag: line.replace(['🚨', '⚠', '\u{fe0f}'], "").trim().to_string(),
                severity: if critical {
                    FlagSeverity::Critical
                } else {
                    FlagSeverity::Warning
                },
                keywords: TEXT_KEYWORDS
                    .iter()
                    .filter(|k| lower.contains(*k))
                    .take(MAX_TEXT_KEYWORDS)
                    .map(|k| k.to_string())
                    .collect(),
            }
        })
        .take(MAX_RED_FLAGS)
        .collect()
}

fn flag(text: String, severity: FlagSeverity, keywords: &[&str]) -> RedFlag {
    RedFlag {
        flag: text,
        severity,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

/// Rule-based red flags from the leading diagnoses, symptom combinations
/// and vitals.
pub fn fallback_red_flags(
    diagnoses: &[DifferentialDiagnosis],
    symptoms: &[String],
    vitals: &VitalSigns,
) -> Vec<RedFlag> {
    let mut flags = Vec::new();

    for dx in diagnoses.iter().take(DIAGNOSES_CONSIDERED) {
        if dx.risk_level != RiskLevel::Red || dx.confidence.point_estimate <= DIAGNOSIS_FLAG_CONFIDENCE {
            continue;
        }
        let name = dx.diagnosis.to_uppercase();
        if name.contains("ACUTE CORONARY")
            || name.contains("MYOCARDIAL")
            || name.contains("HEART ATTACK")
            || contains_word(&name, "ACS")
        {
            flags.push(flag(
                "Possible acute coronary syndrome - immediate ECG and cardiac biomarkers required".into(),
                FlagSeverity::Critical,
                &["chest pain", "cardiac", "acs", "mi"],
            ));
        } else if name.contains("AORTIC DISSECTION") {
            flags.push(flag(
                "Possible aortic dissection - STAT CT angiography and blood pressure control needed".into(),
                FlagSeverity::Critical,
                &["aortic", "dissection", "chest pain", "tearing"],
            ));
        } else if name.contains("PULMONARY EMBOLISM") {
            flags.push(flag(
                "Possible pulmonary embolism - consider immediate anticoagulation".into(),
                FlagSeverity::Critical,
                &["pulmonary embolism", "pe", "dyspnea", "chest pain"],
            ));
        }
    }

    let symptom_text = symptoms.join(" ").to_lowercase();
    if symptom_text.contains("chest pain")
        && (symptom_text.contains("diaphoresis") || symptom_text.contains("sweating"))
        && !flags.iter().any(|f| f.flag.to_lowercase().contains("cardiac"))
    {
        flags.push(flag(
            "Chest pain with diaphoresis - consider cardiac etiology".into(),
            FlagSeverity::Warning,
            &["chest pain", "diaphoresis", "sweating"],
        ));
    }

    if let Some(spo2) = vitals.spo2.filter(|v| *v < 90.0) {
        flags.push(flag(
            format!("Hypoxemia detected (SpO2: {spo2}%) - immediate oxygen supplementation required"),
            FlagSeverity::Critical,
            &["hypoxemia", "oxygen saturation", "spo2"],
        ));
    }
    if let Some(hr) = vitals.heart_rate.filter(|v| *v > 120.0) {
        flags.push(flag(
            format!("Tachycardia (HR: {hr} bpm) - assess for shock, sepsis, or arrhythmia"),
            FlagSeverity::Warning,
            &["tachycardia", "heart rate", "hr"],
        ));
    }
    if let Some(sbp) = vitals.systolic_bp.filter(|v| *v < 90.0) {
        flags.push(flag(
            format!("Hypotension (SBP: {sbp} mmHg) - assess for shock"),
            FlagSeverity::Critical,
            &["hypotension", "blood pressure", "shock"],
        ));
    }

    flags.truncate(MAX_RED_FLAGS);
    flags
}
