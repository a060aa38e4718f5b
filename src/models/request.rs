use serde::{Deserialize, Serialize};

/// How the note reached the service. Only the text is analyzed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Voice,
    Pdf,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
            Self::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalNoteRequest {
    pub clinical_note: String,
    #[serde(default)]
    pub input_type: InputType,
}

impl ClinicalNoteRequest {
    pub fn text(note: &str) -> Self {
        Self {
            clinical_note: note.to_string(),
            input_type: InputType::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_type_defaults_to_text() {
        let req: ClinicalNoteRequest =
            serde_json::from_str(r#"{"clinical_note": "58M chest pain"}"#).unwrap();
        assert_eq!(req.input_type, InputType::Text);
    }
}
