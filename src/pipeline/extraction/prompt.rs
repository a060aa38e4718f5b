/// System prompt for structured symptom extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "\
You are a clinical symptom extraction system. Output must be compatible with \
simple symbolic datasets (CSV symptom lists, rule engines). Use simple symptom \
names a patient or a CSV column would contain (chest pain, heartburn, sour taste, \
shortness of breath). Keep quality, location, severity and radiation as separate \
modifiers. Expand abbreviations (SOB -> shortness of breath, CP -> chest pain, \
N/V -> nausea and vomiting). Extract every negation with its exact phrase. \
Never name diseases. Return only JSON.";

/// Build the extraction prompt for one note.
pub fn build_extraction_prompt(note: &str) -> String {
    format!(
        r#"INPUT CLINICAL NOTE
-------------------
{note}

OUTPUT (STRICT JSON)
--------------------
{{
  "demographics": {{"age": number or null, "sex": "male" | "female" | null}},
  "atomic_symptoms": [
    {{"base_symptom": "chest pain", "quality": string or null, "location": string or null,
      "severity": number 0-10 or null, "radiation": string or null, "timing": string or null,
      "duration": string or null, "frequency": string or null, "progression": string or null}}
  ],
  "triggers": [string],
  "relieving_factors": [string],
  "temporal_pattern": string or null,
  "associated_symptoms": [string],
  "negations": [{{"base_symptom": string, "negation_type": "denied" | "absent", "exact_phrase": string}}],
  "risk_factors": [string],
  "vital_signs": {{"BP": "sys/dia", "HR": number, "RR": number, "T": string, "O2": string}},
  "labs": {{"troponin": number or null, "d_dimer": number or null}},
  "physical_exam": [string],
  "medications": [string],
  "past_medical_history": [string],
  "clinical_red_flags": [string],
  "confidence_notes": [string]
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_note_and_schema() {
        let prompt = build_extraction_prompt("38F burning chest pain after meals");
        assert!(prompt.contains("38F burning chest pain after meals"));
        assert!(prompt.contains("\"atomic_symptoms\""));
        assert!(prompt.contains("\"negations\""));
    }
}
