pub mod parser;
pub mod prompt;
pub mod rules;

pub use parser::{extract_json_block, parse_findings_response};
pub use rules::extract_with_rules;

use thiserror::Error;

use crate::llm::{LlmError, LlmHandle};
use crate::models::ExtractedFindings;
use prompt::{build_extraction_prompt, EXTRACTION_SYSTEM_PROMPT};

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Malformed extraction response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Structured findings for a note. The LLM is tried first when available;
/// any failure, or a reply without symptoms, falls back to rules. Rule
/// output also fills numeric gaps (vitals, labs, demographics) the LLM left.
pub fn extract_findings(note: &str, llm: Option<&LlmHandle>) -> ExtractedFindings {
    let rules = extract_with_rules(note);
    let Some(llm) = llm else {
        tracing::info!("No LLM configured, using rule-based extraction");
        return rules;
    };

    match extract_with_llm(note, llm) {
        Ok(mut findings) if !findings.atomic_symptoms.is_empty() => {
            fill_gaps(&mut findings, &rules);
            tracing::info!(
                symptoms = findings.atomic_symptoms.len(),
                negations = findings.negations.len(),
                model = llm.model(),
                "LLM extraction complete"
            );
            findings
        }
        Ok(_) => {
            tracing::warn!("LLM extraction returned no symptoms, falling back to rules");
            rules
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM extraction failed, falling back to rules");
            rules
        }
    }
}

pub fn extract_with_llm(note: &str, llm: &LlmHandle) -> Result<ExtractedFindings, ExtractionError> {
    let response = llm.complete(&build_extraction_prompt(note), EXTRACTION_SYSTEM_PROMPT)?;
    parse_findings_response(&response)
}

fn fill_gaps(findings: &mut ExtractedFindings, rules: &ExtractedFindings) {
    let demo = &mut findings.demographics;
    demo.age = demo.age.or(rules.demographics.age);
    demo.sex = demo.sex.or(rules.demographics.sex);

    let vitals = &mut findings.vital_signs;
    let rv = &rules.vital_signs;
    vitals.heart_rate = vitals.heart_rate.or(rv.heart_rate);
    vitals.systolic_bp = vitals.systolic_bp.or(rv.systolic_bp);
    vitals.diastolic_bp = vitals.diastolic_bp.or(rv.diastolic_bp);
    vitals.respiratory_rate = vitals.respiratory_rate.or(rv.respiratory_rate);
    vitals.temperature = vitals.temperature.or(rv.temperature);
    vitals.spo2 = vitals.spo2.or(rv.spo2);

    let labs = &mut findings.labs;
    labs.troponin = labs.troponin.or(rules.labs.troponin);
    labs.d_dimer = labs.d_dimer.or(rules.labs.d_dimer);
    labs.wbc = labs.wbc.or(rules.labs.wbc);
    labs.bnp = labs.bnp.or(rules.labs.bnp);

    for rf in &rules.risk_factors {
        let known = findings
            .risk_factors
            .iter()
            .any(|r| r.to_lowercase().contains(&rf.to_lowercase()));
        if !known {
            findings.risk_factors.push(rf.clone());
        }
    }
    if findings.temporal_pattern.is_none() {
        findings.temporal_pattern = rules.temporal_pattern.clone();
    }
    if findings.medications.is_empty() {
        findings.medications = rules.medications.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    const NOTE: &str = "62 year old male, chest pressure on exertion. BP 160/95, HR 98. Smoker.";

    #[test]
    fn no_llm_uses_rules() {
        let findings = extract_findings(NOTE, None);
        assert!(findings.extracted_by_rules);
        assert_eq!(findings.atomic_symptoms[0].base_symptom, "chest pain");
    }

    #[test]
    fn failing_llm_falls_back_to_rules() {
        let llm = LlmHandle::new(MockLlmClient::failing(), "mock-model");
        let findings = extract_findings(NOTE, Some(&llm));
        assert!(findings.extracted_by_rules);
    }

    #[test]
    fn unusable_reply_falls_back_to_rules() {
        let llm = LlmHandle::new(MockLlmClient::new("Sorry, I can't do that."), "mock-model");
        assert!(extract_findings(NOTE, Some(&llm)).extracted_by_rules);

        let llm = LlmHandle::new(MockLlmClient::new(r#"{"atomic_symptoms": []}"#), "mock-model");
        assert!(extract_findings(NOTE, Some(&llm)).extracted_by_rules);
    }

    #[test]
    fn llm_findings_gain_rule_vitals() {
        let reply = r#"{"atomic_symptoms": [{"base_symptom": "chest pain", "quality": "pressure"}],
                        "triggers": ["exertion"], "risk_factors": ["smoker"]}"#;
        let llm = LlmHandle::new(MockLlmClient::new(reply), "mock-model");
        let findings = extract_findings(NOTE, Some(&llm));

        assert!(!findings.extracted_by_rules);
        assert_eq!(findings.atomic_symptoms[0].quality.as_deref(), Some("pressure"));
        assert_eq!(findings.vital_signs.systolic_bp, Some(160.0));
        assert_eq!(findings.vital_signs.heart_rate, Some(98.0));
        assert_eq!(findings.demographics.age, Some(62));
        // "smoker" from the LLM does not contain "smoking", so the rule label is added
        assert!(findings.risk_factors.contains(&"smoking".to_string()));
    }
}
