//! LLM review of dataset candidates, and LLM generation when the datasets
//! produce nothing usable.

use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

use crate::llm::{LlmError, LlmHandle};
use crate::models::{
    CandidateDiagnosis, Demographics, EvidenceStrength, EvidenceType, ExtractedFindings, Provenance,
};
use crate::pipeline::extraction::extract_json_block;

const MAX_GENERATED: usize = 3;
const PROMPT_SYMPTOMS: usize = 10;
const GENERATION_NOTE_CHARS: usize = 2000;
/// Base confidence for generated diagnoses that state none.
const DEFAULT_GENERATED_CONFIDENCE: f64 = 0.5;

const REVIEW_SYSTEM_PROMPT: &str = "\
You are a medical diagnosis validator. Approve only diagnoses that genuinely \
match the symptom pattern. When unsure, reject. Return only JSON.";

const GENERATION_SYSTEM_PROMPT: &str = "\
You are a senior emergency medicine physician. Rank differentials by clinical \
likelihood and use specific disease names. Return only JSON.";

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Malformed review response: {0}")]
    MalformedResponse(String),
}

// ═══════════════════════════════════════════════════════════
// Candidate validation
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct ReviewReply {
    #[serde(default)]
    validated: Vec<String>,
    #[serde(default)]
    rejected: serde_json::Map<String, serde_json::Value>,
}

/// Keep only candidates the LLM approves. Without an LLM, or when the call
/// or its reply fails, every candidate is kept. An empty result means the
/// LLM rejected them all.
pub fn review_candidates(
    llm: Option<&LlmHandle>,
    candidates: Vec<CandidateDiagnosis>,
    symptoms: &[String],
    demographics: &Demographics,
) -> Vec<CandidateDiagnosis> {
    let Some(llm) = llm else {
        return candidates;
    };
    if candidates.is_empty() {
        return candidates;
    }

    let prompt = build_review_prompt(&candidates, symptoms, demographics);
    let reply = llm
        .complete(&prompt, REVIEW_SYSTEM_PROMPT)
        .map_err(ReviewError::from)
        .and_then(|r| parse_review_reply(&r));

    match reply {
        Ok(reply) => {
            let approved: HashSet<String> = reply
                .validated
                .iter()
                .map(|n| n.trim().to_lowercase())
                .collect();
            for (name, reason) in &reply.rejected {
                tracing::info!(diagnosis = %name, reason = %reason, "Candidate rejected on review");
            }
            let total = candidates.len();
            let validated: Vec<CandidateDiagnosis> = candidates
                .into_iter()
                .filter(|c| approved.contains(&c.name.trim().to_lowercase()))
                .map(|mut c| {
                    c.provenance.llm_used = true;
                    c
                })
                .collect();
            tracing::info!(validated = validated.len(), total, "Candidate review complete");
            validated
        }
        Err(e) => {
            tracing::warn!(error = %e, "Candidate review failed, keeping all candidates");
            candidates
        }
    }
}

fn build_review_prompt(
    candidates: &[CandidateDiagnosis],
    symptoms: &[String],
    demographics: &Demographics,
) -> String {
    let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
    let names = serde_json::to_string_pretty(&names).unwrap_or_default();
    format!(
        r#"PATIENT SYMPTOMS: {symptoms}

PATIENT AGE/SEX: {age}y {sex}

CANDIDATE DIAGNOSES (from medical datasets):
{names}

TASK: Determine which diagnoses are actually appropriate for this patient.

RULES:
1. Only approve diagnoses that genuinely match the symptom pattern
2. Reject poor matches even if the datasets suggested them
3. If none are appropriate, return an empty list
4. Be conservative: when unsure, reject

OUTPUT (JSON only, no markdown):
{{
  "validated": ["diagnosis1", "diagnosis2"],
  "rejected": {{"diagnosis3": "reason"}}
}}"#,
        symptoms = symptoms.iter().take(PROMPT_SYMPTOMS).cloned().collect::<Vec<_>>().join(", "),
        age = demographics.age.map(|a| a.to_string()).unwrap_or_else(|| "unknown".into()),
        sex = demographics.sex.map(|s| s.as_str()).unwrap_or("unknown"),
    )
}

fn parse_review_reply(response: &str) -> Result<ReviewReply, ReviewError> {
    let json = extract_json_block(response, '{', '}')
        .ok_or_else(|| ReviewError::MalformedResponse("No JSON object found".into()))?;
    serde_json::from_str(json).map_err(|e| ReviewError::MalformedResponse(e.to_string()))
}

// ═══════════════════════════════════════════════════════════
// Generation fallback
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct GeneratedDiagnosis {
    diagnosis: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    supporting_features: Vec<String>,
}

/// Up to three LLM-generated hypotheses. When generation is impossible or
/// fails, generic placeholders asking for further workup are returned so
/// the response is never empty.
pub fn generate_candidates(
    llm: Option<&LlmHandle>,
    note: &str,
    findings: &ExtractedFindings,
    symptoms: &[String],
) -> Vec<CandidateDiagnosis> {
    let Some(llm) = llm else {
        tracing::warn!("No dataset candidates and no LLM; using placeholder diagnoses");
        return placeholder_candidates();
    };

    let prompt = build_generation_prompt(note, findings, symptoms);
    let generated = llm
        .complete(&prompt, GENERATION_SYSTEM_PROMPT)
        .map_err(ReviewError::from)
        .and_then(|r| parse_generated(&r, symptoms.len()));

    match generated {
        Ok(candidates) if !candidates.is_empty() => {
            tracing::info!(generated = candidates.len(), "LLM generated fallback diagnoses");
            candidates
        }
        Ok(_) => {
            tracing::warn!("LLM generated no diagnoses; using placeholders");
            placeholder_candidates()
        }
        Err(e) => {
            tracing::error!(error = %e, "Diagnosis generation failed; using placeholders");
            placeholder_candidates()
        }
    }
}

fn build_generation_prompt(note: &str, findings: &ExtractedFindings, symptoms: &[String]) -> String {
    let excerpt: String = note.chars().take(GENERATION_NOTE_CHARS).collect();
    let symptom_list = if symptoms.is_empty() {
        "Not clearly identified".to_string()
    } else {
        symptoms.iter().take(15).cloned().collect::<Vec<_>>().join(", ")
    };
    let vitals = if findings.vital_signs.recorded_count() == 0 {
        "Not provided".to_string()
    } else {
        serde_json::to_string_pretty(&findings.vital_signs).unwrap_or_default()
    };
    let demo = &findings.demographics;
    format!(
        r#"The dataset matchers found no usable candidate for this case.
Generate the {MAX_GENERATED} most likely differential diagnoses.

CLINICAL NOTE:
{excerpt}

KEY SYMPTOMS: {symptom_list}

VITAL SIGNS:
{vitals}

DEMOGRAPHICS: age {age}, sex {sex}

RULES:
1. ACS/MI ranks high with central pressure pain, radiation and sweating.
2. Aortic dissection only with tearing pain or sudden onset.
3. Downgrade PE without dyspnea or tachycardia.
4. Consider GERD when pain is burning or non-exertional.

OUTPUT (JSON array only, most likely first):
[
  {{"diagnosis": "name", "confidence": 0.0-1.0, "reasoning": "2-3 sentences", "supporting_features": ["..."]}}
]"#,
        age = demo.age.map(|a| a.to_string()).unwrap_or_else(|| "unknown".into()),
        sex = demo.sex.map(|s| s.as_str()).unwrap_or("unknown"),
    )
}

fn parse_generated(response: &str, total_symptoms: usize) -> Result<Vec<CandidateDiagnosis>, ReviewError> {
    let items: Vec<serde_json::Value> = match extract_json_block(response, '[', ']') {
        Some(json) => serde_json::from_str(json).map_err(|e| ReviewError::MalformedResponse(e.to_string()))?,
        None => {
            let json = extract_json_block(response, '{', '}')
                .ok_or_else(|| ReviewError::MalformedResponse("No JSON found".into()))?;
            vec![serde_json::from_str(json).map_err(|e| ReviewError::MalformedResponse(e.to_string()))?]
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|v| serde_json::from_value::<GeneratedDiagnosis>(v).ok())
        .filter(|g| !g.diagnosis.trim().is_empty())
        .take(MAX_GENERATED)
        .map(|g| CandidateDiagnosis {
            name: g.diagnosis.trim().to_string(),
            match_score: g
                .confidence
                .unwrap_or(DEFAULT_GENERATED_CONFIDENCE)
                .clamp(0.0, 1.0),
            matched_symptoms: g.supporting_features,
            total_symptoms,
            evidence_strength: EvidenceStrength::Weak,
            evidence_type: EvidenceType::LlmGenerated,
            provenance: Provenance::llm(),
            severity: None,
            llm_reasoning: g.reasoning.filter(|r| !r.trim().is_empty()),
        })
        .collect())
}

fn placeholder_candidates() -> Vec<CandidateDiagnosis> {
    [
        (
            "Undifferentiated Acute Illness",
            0.4,
            "Presentation does not match specific disease patterns. Comprehensive diagnostic workup recommended.",
        ),
        (
            "Non-specific Symptoms (Differential Pending)",
            0.3,
            "Symptoms do not clearly indicate a specific diagnosis. Further history, examination and testing needed.",
        ),
        (
            "Clinical Presentation Requiring Further Evaluation",
            0.2,
            "Insufficient data for a definitive diagnosis. Recommend comprehensive clinical assessment.",
        ),
    ]
    .into_iter()
    .map(|(name, score, reasoning)| CandidateDiagnosis {
        name: name.to_string(),
        match_score: score,
        matched_symptoms: Vec::new(),
        total_symptoms: 0,
        evidence_strength: EvidenceStrength::Weak,
        evidence_type: EvidenceType::RuleBasedFallback,
        provenance: Provenance::fallback(),
        severity: None,
        llm_reasoning: Some(reasoning.to_string()),
    })
    .collect()
}
