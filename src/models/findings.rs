use serde::{Deserialize, Deserializer, Serialize};

/// Patient sex as stated in the note.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[serde(alias = "m", alias = "M", alias = "Male", alias = "MALE", alias = "man")]
    Male,
    #[serde(alias = "f", alias = "F", alias = "Female", alias = "FEMALE", alias = "woman")]
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Demographics {
    #[serde(default, deserialize_with = "lenient_u32")]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "lenient_sex")]
    pub sex: Option<Sex>,
}

/// A single symptom with its clinical modifiers kept separate from the base name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AtomicSymptom {
    pub base_symptom: String,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// 0-10 scale.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub severity: Option<f64>,
    #[serde(default)]
    pub radiation: Option<String>,
    #[serde(default)]
    pub timing: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub progression: Option<String>,
}

impl AtomicSymptom {
    pub fn named(base: &str) -> Self {
        Self {
            base_symptom: base.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Negation {
    pub base_symptom: String,
    #[serde(default = "default_negation_type")]
    pub negation_type: String,
    #[serde(default)]
    pub exact_phrase: String,
}

fn default_negation_type() -> String {
    "denied".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VitalSigns {
    pub heart_rate: Option<f64>,
    pub systolic_bp: Option<f64>,
    pub diastolic_bp: Option<f64>,
    pub respiratory_rate: Option<f64>,
    /// Degrees as written; values above 50 are Fahrenheit.
    pub temperature: Option<f64>,
    pub spo2: Option<f64>,
}

impl VitalSigns {
    /// Number of the five core vitals (HR, BP, RR, temp, SpO2) that are present.
    pub fn recorded_count(&self) -> usize {
        [
            self.heart_rate,
            self.systolic_bp,
            self.respiratory_rate,
            self.temperature,
            self.spo2,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }

    /// Labels of the core vitals that are absent.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.heart_rate.is_none() {
            missing.push("HR");
        }
        if self.systolic_bp.is_none() {
            missing.push("BP");
        }
        if self.respiratory_rate.is_none() {
            missing.push("RR");
        }
        if self.temperature.is_none() {
            missing.push("Temp");
        }
        if self.spo2.is_none() {
            missing.push("SpO2");
        }
        missing
    }

    /// Build from a loosely keyed object such as `{"BP": "150/90", "HR": 110, "O2": "94%"}`.
    pub fn from_loose_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut vitals = Self::default();
        for (key, value) in map {
            let text = match value {
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::String(s) => s.clone(),
                _ => continue,
            };
            match key.to_lowercase().replace(['_', ' '], "").as_str() {
                "hr" | "heartrate" | "pulse" => vitals.heart_rate = first_number(&text),
                "bp" | "bloodpressure" => {
                    let mut parts = text.split('/');
                    vitals.systolic_bp = parts.next().and_then(first_number);
                    vitals.diastolic_bp = parts.next().and_then(first_number);
                }
                "sbp" | "systolic" | "systolicbp" => vitals.systolic_bp = first_number(&text),
                "dbp" | "diastolic" | "diastolicbp" => vitals.diastolic_bp = first_number(&text),
                "rr" | "respiratoryrate" | "resp" => vitals.respiratory_rate = first_number(&text),
                "t" | "temp" | "temperature" => vitals.temperature = first_number(&text),
                "o2" | "spo2" | "o2sat" | "sat" | "oxygensaturation" => {
                    vitals.spo2 = first_number(&text)
                }
                _ => {}
            }
        }
        vitals
    }
}

/// Laboratory values that influence scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LabValues {
    pub troponin: Option<f64>,
    pub d_dimer: Option<f64>,
    pub wbc: Option<f64>,
    pub bnp: Option<f64>,
}

impl LabValues {
    pub fn recorded_count(&self) -> usize {
        [self.troponin, self.d_dimer, self.wbc, self.bnp]
            .iter()
            .filter(|v| v.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded_count() == 0
    }
}

/// Everything extracted from a clinical note, LLM-derived or rule-derived.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedFindings {
    pub chief_complaint: Option<String>,
    pub demographics: Demographics,
    pub atomic_symptoms: Vec<AtomicSymptom>,
    pub triggers: Vec<String>,
    pub relieving_factors: Vec<String>,
    pub temporal_pattern: Option<String>,
    pub associated_symptoms: Vec<String>,
    pub negations: Vec<Negation>,
    pub risk_factors: Vec<String>,
    pub vital_signs: VitalSigns,
    pub labs: LabValues,
    pub physical_exam: Vec<String>,
    pub medications: Vec<String>,
    pub past_medical_history: Vec<String>,
    pub clinical_red_flags: Vec<String>,
    pub confidence_notes: Option<String>,
    /// True when the rule-based extractor produced these findings.
    pub extracted_by_rules: bool,
}

impl ExtractedFindings {
    /// All negated base symptoms, lowercased.
    pub fn negated_symptoms(&self) -> Vec<String> {
        self.negations
            .iter()
            .map(|n| n.base_symptom.to_lowercase())
            .collect()
    }

    /// Negated symptoms joined into one lowercase haystack for substring checks.
    pub fn negation_text(&self) -> String {
        self.negated_symptoms().join(" ")
    }

    /// Lowercased base symptoms plus associated symptoms.
    pub fn symptom_names(&self) -> Vec<String> {
        self.atomic_symptoms
            .iter()
            .map(|s| s.base_symptom.to_lowercase())
            .chain(self.associated_symptoms.iter().map(|s| s.to_lowercase()))
            .collect()
    }

    pub fn has_symptom(&self, needle: &str) -> bool {
        self.symptom_names().iter().any(|s| s.contains(needle))
    }

    pub fn has_risk_factor(&self, needle: &str) -> bool {
        self.risk_factors
            .iter()
            .chain(self.past_medical_history.iter())
            .any(|r| r.to_lowercase().contains(needle))
    }
}

/// First decimal number in a string ("94%" -> 94.0, "38.5C" -> 38.5).
pub fn first_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.trim_end_matches('.').parse().ok()
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => first_number(&s),
        _ => None,
    })
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(lenient_f64(deserializer)?.filter(|v| *v >= 0.0).map(|v| v as u32))
}

fn lenient_sex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Sex>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| match s.trim().to_lowercase().as_str() {
        "male" | "m" | "man" => Some(Sex::Male),
        "female" | "f" | "woman" => Some(Sex::Female),
        _ => None,
    }))
}
