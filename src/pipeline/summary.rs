//! Clinical summary block of the response.

use crate::clinical::contains_word;
use crate::llm::LlmHandle;
use crate::models::{ClinicalSummary, ExtractedFindings};
use crate::pipeline::scoring::uncertainty_level;

/// Missing-information categories the uncertainty label is judged against.
pub const EXPECTED_INFORMATION_CATEGORIES: usize = 6;
const SUMMARY_SYMPTOMS: usize = 10;
const KEY_EXAM_FINDINGS: usize = 5;

const SUMMARY_SYSTEM_PROMPT: &str = "\
You write concise clinical summaries in a professional medical tone. \
Synthesize; never copy the note verbatim.";

/// Coarse onset class from wording in the note.
pub fn classify_timeline(note: &str) -> &'static str {
    let note = note.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| contains_word(&note, w));
    if any(&["acute", "sudden", "hours", "today"]) {
        "Acute presentation"
    } else if any(&["weeks", "days", "subacute"]) {
        "Subacute (days to weeks)"
    } else if any(&["months", "years", "chronic"]) {
        "Chronic presentation"
    } else {
        "Timeline not specified"
    }
}

/// Assemble the summary. The narrative comes from the LLM when one is
/// available and answers; otherwise a template sentence is used.
pub fn build_summary(
    llm: Option<&LlmHandle>,
    note: &str,
    findings: &ExtractedFindings,
    missing_information: Vec<String>,
) -> ClinicalSummary {
    let symptoms = findings.symptom_names();
    let negations = findings.negated_symptoms();
    let timeline = classify_timeline(note);

    let chief_complaint = findings
        .chief_complaint
        .clone()
        .filter(|c| !c.trim().is_empty())
        .or_else(|| symptoms.first().cloned())
        .unwrap_or_else(|| "Clinical presentation".to_string());

    let summary = llm
        .and_then(|llm| {
            let prompt = build_summary_prompt(findings, &symptoms, &negations, timeline);
            match llm.complete(&prompt, SUMMARY_SYSTEM_PROMPT) {
                Ok(text) => Some(text.replace("```", "").trim().to_string()),
                Err(e) => {
                    tracing::warn!(error = %e, "Summary generation failed, using template");
                    None
                }
            }
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| template_summary(&symptoms, &negations));

    let key_findings = symptoms
        .iter()
        .take(SUMMARY_SYMPTOMS)
        .chain(findings.physical_exam.iter().take(KEY_EXAM_FINDINGS))
        .cloned()
        .collect();

    ClinicalSummary {
        summary,
        chief_complaint,
        timeline: timeline.to_string(),
        key_findings,
        uncertainty_level: uncertainty_level(missing_information.len(), EXPECTED_INFORMATION_CATEGORIES)
            .to_string(),
        missing_information,
    }
}

pub fn template_summary(symptoms: &[String], negations: &[String]) -> String {
    let symptoms = if symptoms.is_empty() {
        "no specific symptoms".to_string()
    } else {
        symptoms.iter().take(5).cloned().collect::<Vec<_>>().join(", ")
    };
    let negations = if negations.is_empty() {
        "none documented".to_string()
    } else {
        negations.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
    };
    format!("Patient presents with {symptoms}. Negations: {negations}.")
}

fn build_summary_prompt(
    findings: &ExtractedFindings,
    symptoms: &[String],
    negations: &[String],
    timeline: &str,
) -> String {
    let demo = &findings.demographics;
    let join = |items: &[String], n: usize| items.iter().take(n).cloned().collect::<Vec<_>>().join(", ");
    format!(
        r#"Generate a concise clinical summary from these extracted findings.

DEMOGRAPHICS: Age {age}, {sex}
SYMPTOMS: {symptoms}
NEGATIONS: {negations}
TRIGGERS: {triggers}
TIMELINE: {timeline}

REQUIREMENTS:
1. Mix short paragraphs and bullet points
2. Include presentation, key features and significant negatives
3. End with one sentence of assessment
4. At most 6 sentences and 5 bullets

OUTPUT FORMAT:
**Clinical Presentation**
**Key Features**
**Significant Negatives**
**Assessment**

Generate only the formatted summary."#,
        age = demo.age.map(|a| a.to_string()).unwrap_or_else(|| "unknown".into()),
        sex = demo.sex.map(|s| s.as_str()).unwrap_or("unknown"),
        symptoms = join(symptoms, SUMMARY_SYMPTOMS),
        negations = join(negations, 5),
        triggers = join(&findings.triggers, 5),
    )
}
