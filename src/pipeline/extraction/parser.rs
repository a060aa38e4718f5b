use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::ExtractionError;
use crate::models::{
    AtomicSymptom, Demographics, ExtractedFindings, LabValues, Negation, VitalSigns,
};
use crate::pipeline::normalize::{normalize_base_symptom, normalize_negated_symptom};

/// Remove Markdown code fences and any prose around the outermost JSON
/// value that starts with `open` and ends with `close`.
pub fn extract_json_block(response: &str, open: char, close: char) -> Option<&str> {
    let cleaned = response.trim();
    let start = cleaned.find(open)?;
    let end = cleaned.rfind(close)?;
    (end > start).then(|| &cleaned[start..=end])
}

/// Parse the extraction model's reply into findings. Malformed items are
/// skipped; only an unparsable top-level object is an error.
pub fn parse_findings_response(response: &str) -> Result<ExtractedFindings, ExtractionError> {
    let json = extract_json_block(response, '{', '}')
        .ok_or_else(|| ExtractionError::MalformedResponse("No JSON object found".into()))?;

    #[derive(Deserialize)]
    struct RawFindings {
        demographics: Option<serde_json::Value>,
        atomic_symptoms: Option<Vec<serde_json::Value>>,
        triggers: Option<serde_json::Value>,
        relieving_factors: Option<serde_json::Value>,
        temporal_pattern: Option<serde_json::Value>,
        associated_symptoms: Option<serde_json::Value>,
        negations: Option<Vec<serde_json::Value>>,
        risk_factors: Option<serde_json::Value>,
        vital_signs: Option<serde_json::Value>,
        labs: Option<serde_json::Value>,
        physical_exam: Option<serde_json::Value>,
        medications: Option<serde_json::Value>,
        past_medical_history: Option<serde_json::Value>,
        clinical_red_flags: Option<serde_json::Value>,
        confidence_notes: Option<serde_json::Value>,
    }

    let raw: RawFindings =
        serde_json::from_str(json).map_err(|e| ExtractionError::JsonParsing(e.to_string()))?;

    let demographics: Demographics = raw
        .demographics
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    let atomic_symptoms: Vec<AtomicSymptom> = parse_array_lenient(raw.atomic_symptoms.as_deref())
        .into_iter()
        .filter_map(|mut s: AtomicSymptom| {
            s.base_symptom = normalize_base_symptom(&s.base_symptom)?;
            s.quality = clean_modifier(s.quality);
            s.location = clean_modifier(s.location);
            s.radiation = clean_modifier(s.radiation);
            s.timing = clean_modifier(s.timing);
            s.duration = clean_modifier(s.duration);
            s.frequency = clean_modifier(s.frequency);
            s.progression = clean_modifier(s.progression);
            s.severity = s.severity.filter(|v| (0.0..=10.0).contains(v));
            Some(s)
        })
        .collect();

    let negations = raw
        .negations
        .unwrap_or_default()
        .into_iter()
        .filter_map(parse_negation)
        .collect();

    let vital_signs = match raw.vital_signs {
        Some(serde_json::Value::Object(map)) => VitalSigns::from_loose_map(&map),
        _ => VitalSigns::default(),
    };

    let labs = match raw.labs {
        Some(serde_json::Value::Object(map)) => LabValues {
            troponin: number_field(&map, &["troponin", "Troponin", "trop"]),
            d_dimer: number_field(&map, &["d_dimer", "d-dimer", "D-dimer", "ddimer"]),
            wbc: number_field(&map, &["wbc", "WBC"]),
            bnp: number_field(&map, &["bnp", "BNP"]),
        },
        _ => LabValues::default(),
    };

    let atomic_names: Vec<String> = atomic_symptoms.iter().map(|s| s.base_symptom.clone()).collect();
    let associated_symptoms = string_list(raw.associated_symptoms)
        .into_iter()
        .filter_map(|s| normalize_base_symptom(&s))
        .filter(|s| !atomic_names.contains(s))
        .collect();

    let chief_complaint = atomic_symptoms.first().map(|s| s.base_symptom.clone());

    Ok(ExtractedFindings {
        chief_complaint,
        demographics,
        atomic_symptoms,
        triggers: string_list(raw.triggers),
        relieving_factors: string_list(raw.relieving_factors),
        temporal_pattern: raw
            .temporal_pattern
            .and_then(|v| v.as_str().map(str::to_string))
            .and_then(|s| clean_modifier(Some(s))),
        associated_symptoms,
        negations,
        risk_factors: string_list(raw.risk_factors),
        vital_signs,
        labs,
        physical_exam: string_list(raw.physical_exam),
        medications: string_list(raw.medications),
        past_medical_history: string_list(raw.past_medical_history),
        clinical_red_flags: string_list(raw.clinical_red_flags),
        confidence_notes: {
            let notes = string_list(raw.confidence_notes);
            (!notes.is_empty()).then(|| notes.join("; "))
        },
        extracted_by_rules: false,
    })
}

/// Parse an array leniently: skip items that fail to deserialize.
pub fn parse_array_lenient<T: DeserializeOwned>(items: Option<&[serde_json::Value]>) -> Vec<T> {
    match items {
        None => vec![],
        Some(arr) => arr
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect(),
    }
}

/// Accepts either `["a", "b"]` or a single string; drops empties and "null".
fn string_list(value: Option<serde_json::Value>) -> Vec<String> {
    let items = match value {
        Some(serde_json::Value::Array(arr)) => arr,
        Some(serde_json::Value::String(s)) => vec![serde_json::Value::String(s)],
        _ => return vec![],
    };
    items
        .into_iter()
        .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .collect()
}

fn parse_negation(value: serde_json::Value) -> Option<Negation> {
    let mut negation = match value {
        serde_json::Value::String(s) => Negation {
            base_symptom: s.clone(),
            negation_type: "denied".into(),
            exact_phrase: s,
        },
        other => serde_json::from_value::<Negation>(other).ok()?,
    };
    negation.base_symptom = normalize_negated_symptom(&negation.base_symptom)?;
    Some(negation)
}

/// Models write "null" or "" for absent modifiers.
fn clean_modifier(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty() && v != "null" && v != "none" && v != "n/a")
}

fn number_field(map: &serde_json::Map<String, serde_json::Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| match map.get(*k)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => crate::models::first_number(s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sex;

    fn sample_response() -> String {
        r#"```json
{
  "demographics": {"age": 38, "sex": "female"},
  "atomic_symptoms": [
    {"base_symptom": "Chest discomfort", "quality": "Burning", "location": "null",
     "severity": null, "radiation": null, "timing": "episodic"},
    {"base_symptom": "taste disturbance", "quality": "sour", "location": "mouth"},
    {"quality": "missing base"}
  ],
  "triggers": ["meals", "lying flat"],
  "temporal_pattern": "postprandial",
  "associated_symptoms": ["nausea", "chest pain"],
  "negations": [
    {"base_symptom": "dyspnea", "exact_phrase": "denies SOB"},
    {"base_symptom": "diaphoresis", "negation_type": "denied", "exact_phrase": "denies diaphoresis"},
    "radiation"
  ],
  "risk_factors": [],
  "vital_signs": {"BP": "128/82", "HR": 88},
  "labs": {"troponin": "0.01"},
  "clinical_red_flags": [],
  "confidence_notes": ["duration unclear"]
}
```"#
        .to_string()
    }

    #[test]
    fn parse_full_response() {
        let findings = parse_findings_response(&sample_response()).unwrap();

        assert_eq!(findings.demographics.age, Some(38));
        assert_eq!(findings.demographics.sex, Some(Sex::Female));

        assert_eq!(findings.atomic_symptoms.len(), 2);
        let first = &findings.atomic_symptoms[0];
        assert_eq!(first.base_symptom, "chest pain");
        assert_eq!(first.quality.as_deref(), Some("burning"));
        assert_eq!(first.location, None);
        assert_eq!(findings.atomic_symptoms[1].base_symptom, "sour taste");

        assert_eq!(findings.triggers, vec!["meals", "lying flat"]);
        assert_eq!(findings.temporal_pattern.as_deref(), Some("postprandial"));
        // "chest pain" is already an atomic symptom
        assert_eq!(findings.associated_symptoms, vec!["nausea"]);

        let negated = findings.negated_symptoms();
        assert_eq!(negated, vec!["shortness of breath", "sweating", "radiation"]);

        assert_eq!(findings.vital_signs.systolic_bp, Some(128.0));
        assert_eq!(findings.vital_signs.heart_rate, Some(88.0));
        assert_eq!(findings.labs.troponin, Some(0.01));
        assert_eq!(findings.confidence_notes.as_deref(), Some("duration unclear"));
        assert_eq!(findings.chief_complaint.as_deref(), Some("chest pain"));
        assert!(!findings.extracted_by_rules);
    }

    #[test]
    fn prose_around_json_is_ignored() {
        let findings = parse_findings_response(
            "Here you go: {\"atomic_symptoms\": [{\"base_symptom\": \"cough\"}]} hope this helps",
        )
        .unwrap();
        assert_eq!(findings.atomic_symptoms[0].base_symptom, "cough");
    }

    #[test]
    fn missing_object_is_malformed() {
        let err = parse_findings_response("I cannot help with that").unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedResponse(_)));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = parse_findings_response("{\"atomic_symptoms\": [}").unwrap_err();
        assert!(matches!(err, ExtractionError::JsonParsing(_)));
    }

    #[test]
    fn out_of_range_severity_dropped() {
        let findings = parse_findings_response(
            r#"{"atomic_symptoms": [{"base_symptom": "headache", "severity": 14}]}"#,
        )
        .unwrap();
        assert_eq!(findings.atomic_symptoms[0].severity, None);
    }

    #[test]
    fn extract_json_block_handles_arrays() {
        assert_eq!(extract_json_block("```json\n[1, 2]\n```", '[', ']'), Some("[1, 2]"));
        assert_eq!(extract_json_block("no json", '[', ']'), None);
    }
}
