//! Input gate: rejects empty, oversized, gibberish and non-clinical text
//! before any LLM call is made.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

pub const MIN_NOTE_CHARS: usize = 20;
pub const MAX_NOTE_CHARS: usize = 10_000;
pub const MIN_MEDICAL_KEYWORDS: usize = 2;

const MEDICAL_KEYWORDS: &[&str] = &[
    // Symptoms
    "pain", "ache", "fever", "nausea", "vomiting", "diarrhea", "headache", "chest",
    "abdominal", "dyspnea", "shortness of breath", "sob", "fatigue", "weakness",
    "dizziness", "cough", "rash", "swelling",
    // Vitals
    "bp", "blood pressure", "hr", "heart rate", "temp", "temperature", "spo2", "oxygen",
    "pulse", "rr", "respiratory rate",
    // Clinical vocabulary
    "patient", "history", "presenting", "complaint", "diagnosis", "examination",
    "assessment", "plan", "treatment", "medication", "acute", "chronic", "severe", "mild",
    "moderate",
    // Anatomy
    "heart", "lung", "stomach", "head", "back", "leg", "arm", "cardiac", "pulmonary",
    "gastrointestinal", "neurological",
    // Demographics
    "year old", "y/o", "yo", "male", "female", "m", "f", "age", "gender", "sex",
];

/// Legitimate clinical words of 15+ letters that must not trip the
/// long-run gibberish check.
const LONG_CLINICAL_WORDS: &[&str] = &[
    "gastrointestinal", "gastroesophageal", "electrocardiogram", "electrocardiography",
    "echocardiogram", "echocardiography", "hypercholesterolemia", "lightheadedness",
    "atherosclerosis", "costochondritis", "thrombocytopenia", "musculoskeletal",
    "glomerulonephritis", "hyperventilation", "cholecystectomy", "cholecystitis",
    "pneumomediastinum", "hypertriglyceridemia", "bronchopneumonia", "thromboembolism",
    "thromboembolic", "gastroenteritis", "esophagogastroduodenoscopy", "diaphoretically",
    "neurologically", "intermittently", "retrosternally", "hydrochlorothiazide",
    "spironolactone", "methylprednisolone", "trimethoprim", "sulfamethoxazole",
    "levothyroxine", "nitroglycerine", "acetaminophen", "hypoalbuminemia",
    "hyperbilirubinemia", "polymyalgia", "lymphadenopathy", "hepatosplenomegaly",
    "rhabdomyolysis", "pneumothorax", "tachyarrhythmia", "bradyarrhythmia",
    "immunocompromised", "immunosuppressed", "immunosuppression", "disproportionate",
    "uncomplicated", "characteristically", "circumferential", "unremarkable",
];

/// Word parts that long clinical terms are built from. A 15+ letter run that
/// splits entirely into these is vocabulary, not noise.
const MEDICAL_MORPHEMES: &[&str] = &[
    // Prefixes
    "a", "an", "ab", "ad", "anti", "auto", "bi", "brady", "circum", "contra", "de", "dys",
    "endo", "epi", "extra", "hemi", "hyper", "hypo", "infra", "inter", "intra", "macro",
    "micro", "multi", "neo", "non", "para", "peri", "poly", "post", "pre", "pseudo",
    "retro", "semi", "sub", "supra", "tachy", "trans", "tri", "un",
    // Roots
    "abdomin", "aden", "adren", "alges", "angi", "aort", "arrhythm", "arter", "arthr",
    "ather", "atri", "bili", "bronch", "calc", "capill", "carcin", "card", "cardi",
    "cephal", "cerebr", "chlor", "chol", "chondr", "coagul", "col", "coron", "cortic",
    "cost", "crani", "cyst", "cyt", "derm", "diaphor", "dilat", "duoden", "edem", "electr",
    "embol", "encephal", "enter", "esophag", "fibr", "gastr", "gluc", "glyc", "hem",
    "hemat", "hepat", "hist", "hydr", "immun", "infarct", "inflamm", "isch", "kerat",
    "lact", "lapar", "laryng", "leuk", "lip", "lith", "lymph", "mediastin", "megal",
    "mening", "metabol", "my", "myel", "myo", "nephr", "neur", "nitr", "occlus", "ophthalm",
    "oste", "ox", "pancreat", "path", "pector", "pept", "perfus", "pharyng", "phleb",
    "plasm", "pleur", "pneum", "pneumon", "prostat", "pulmon", "pyel", "ren", "respir",
    "rhin", "sclera", "scler", "sept", "sinus", "spasm", "splen", "stern", "suppress",
    "syncop", "tens", "thiazide", "thorac", "thromb", "thyr", "thyroid", "tox", "trache",
    "troponin", "tubul", "urethr", "ur", "vagal", "valv", "vas", "vascul", "ven",
    "ventil", "ventricul", "vertebr",
    // Connectives and suffixes
    "o", "i", "ac", "al", "ant", "ar", "ary", "ase", "ated", "ation", "ative", "cele",
    "centesis", "e", "eal", "ectomy", "ed", "emia", "ent", "es", "gen", "genic", "gram",
    "graphy", "ia", "ial", "ias", "ic", "ical", "ide", "ine", "ing", "ion", "ism", "ist",
    "itis", "ity", "ive", "logist", "logy", "ly", "lysis", "oma", "or", "ory", "osis",
    "ostomy", "otomy", "ous", "pathy", "penia", "plasty", "plegia", "rrhea", "s",
    "scopy", "tic", "tomy", "uria", "y",
];

static LONG_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z]{15,}").unwrap());
static CONSONANT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[b-df-hj-np-tv-z]{10,}").unwrap());
static KEYWORD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    MEDICAL_KEYWORDS
        .iter()
        .map(|kw| Regex::new(&format!(r"(?i)(?:^|[^a-z0-9]){}(?:$|[^a-z0-9])", regex::escape(kw))).unwrap())
        .collect()
});

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    EmptyInput,
    TooShort,
    TooLong,
    Gibberish,
    NotMedical,
}

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::Gibberish => "gibberish",
            Self::NotMedical => "not_medical",
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, PartialEq)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
    pub suggestion: &'static str,
    pub detail: Option<String>,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>, suggestion: &'static str) -> Self {
        Self {
            kind,
            message: message.into(),
            suggestion,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ValidationReport {
    pub length: usize,
    pub medical_score: usize,
}

/// Validate a clinical note. Checks run in order and the first failure wins.
pub fn validate_note(text: &str) -> Result<ValidationReport, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(
            ValidationErrorKind::EmptyInput,
            "Input is empty. Please enter a clinical note.",
            "Enter a patient's clinical information including symptoms, vitals, or history.",
        ));
    }

    let length = trimmed.chars().count();
    if length < MIN_NOTE_CHARS {
        return Err(ValidationError::new(
            ValidationErrorKind::TooShort,
            "Input too short. Please provide more clinical details.",
            "A valid clinical note should be at least 20 characters and include patient symptoms, vitals, or medical history.",
        )
        .with_detail(format!("length {length}, minimum {MIN_NOTE_CHARS}")));
    }
    if length > MAX_NOTE_CHARS {
        return Err(ValidationError::new(
            ValidationErrorKind::TooLong,
            "Input too long. Please limit to 10,000 characters.",
            "Please summarize the clinical information or split into multiple notes.",
        )
        .with_detail(format!("length {length}, maximum {MAX_NOTE_CHARS}")));
    }

    if let Some(detail) = detect_gibberish(text) {
        return Err(ValidationError::new(
            ValidationErrorKind::Gibberish,
            "Input appears to be gibberish or random text.",
            "Please enter a valid clinical note with medical terminology and patient information.",
        )
        .with_detail(detail));
    }

    let medical_score = medical_keyword_count(text);
    if medical_score < MIN_MEDICAL_KEYWORDS {
        return Err(ValidationError::new(
            ValidationErrorKind::NotMedical,
            "Input doesn't appear to be a medical/clinical note.",
            "Please enter a clinical note containing patient symptoms, vitals, medical history, or examination findings.",
        )
        .with_detail(format!("medical score {medical_score}, threshold {MIN_MEDICAL_KEYWORDS}")));
    }

    Ok(ValidationReport {
        length,
        medical_score,
    })
}

/// Returns a description of the first gibberish signal found.
pub fn detect_gibberish(text: &str) -> Option<String> {
    let lower = text.to_lowercase();

    if let Some(m) = LONG_RUN
        .find_iter(&lower)
        .find(|m| !is_clinical_term(m.as_str()))
    {
        let sample: String = m.as_str().chars().take(50).collect();
        return Some(format!("Detected unusual pattern: {sample}"));
    }

    if let Some(c) = repeated_run(&lower, 5) {
        return Some(format!("Detected unusual pattern: {}", c.to_string().repeat(5)));
    }

    if let Some(m) = CONSONANT_START.find(&lower) {
        return Some(format!("Detected unusual pattern: {}", m.as_str()));
    }

    let vowels = lower.chars().filter(|c| "aeiou".contains(*c)).count();
    let consonants = lower
        .chars()
        .filter(|c| c.is_alphabetic() && !"aeiou".contains(*c))
        .count();
    if consonants > 0 {
        let ratio = vowels as f64 / consonants as f64;
        if ratio < 0.15 && text.chars().count() > 30 {
            return Some(format!("Unusual vowel ratio: {ratio:.2}"));
        }
    }

    let total = text.chars().count();
    let special = text
        .chars()
        .filter(|c| !c.is_alphanumeric() && !" .,!?-\n".contains(*c))
        .count();
    if special as f64 > total as f64 * 0.3 {
        return Some(format!("Too many special characters: {special}"));
    }

    None
}

/// Whether a long letter run is a known clinical word or splits entirely
/// into medical word parts.
fn is_clinical_term(word: &str) -> bool {
    if LONG_CLINICAL_WORDS.contains(&word) || MEDICAL_KEYWORDS.contains(&word) {
        return true;
    }
    // reachable[i]: word[..i] splits into morphemes
    let bytes = word.as_bytes();
    let mut reachable = vec![false; bytes.len() + 1];
    reachable[0] = true;
    for start in 0..bytes.len() {
        if !reachable[start] {
            continue;
        }
        for morpheme in MEDICAL_MORPHEMES {
            if bytes[start..].starts_with(morpheme.as_bytes()) {
                reachable[start + morpheme.len()] = true;
            }
        }
    }
    reachable[bytes.len()]
}

/// First character repeated at least `min` times in a row (whitespace ignored).
fn repeated_run(text: &str, min: usize) -> Option<char> {
    let mut prev = None;
    let mut run = 0;
    for c in text.chars() {
        if Some(c) == prev {
            run += 1;
        } else {
            prev = Some(c);
            run = 1;
        }
        if run >= min && !c.is_whitespace() {
            return Some(c);
        }
    }
    None
}

/// Number of distinct medical keywords present as whole words or phrases.
pub fn medical_keyword_count(text: &str) -> usize {
    KEYWORD_PATTERNS.iter().filter(|re| re.is_match(text)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "58 year old male with crushing chest pain radiating to left arm, diaphoretic. BP 150/90, HR 110.";

    #[test]
    fn accepts_typical_note() {
        let report = validate_note(VALID).unwrap();
        assert!(report.medical_score >= 5);
        assert_eq!(report.length, VALID.len());
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert_eq!(validate_note("").unwrap_err().kind, ValidationErrorKind::EmptyInput);
        assert_eq!(validate_note("   \n ").unwrap_err().kind, ValidationErrorKind::EmptyInput);
    }

    #[test]
    fn rejects_short_note_after_trimming() {
        let err = validate_note("   chest pain   ").unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::TooShort);
        assert_eq!(err.kind.as_str(), "too_short");
    }

    #[test]
    fn rejects_overlong_note() {
        let note = "patient has chest pain. ".repeat(500);
        assert_eq!(validate_note(&note).unwrap_err().kind, ValidationErrorKind::TooLong);
    }

    #[test]
    fn long_letter_runs_are_gibberish_unless_clinical() {
        let err = validate_note("patient reports asdfghjklqwertyuiop and chest pain").unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::Gibberish);

        let ok = validate_note("patient with gastrointestinal bleeding and abdominal pain");
        assert!(ok.is_ok());
    }

    #[test]
    fn compound_clinical_terms_are_not_gibberish() {
        for note in [
            "62 year old male with history of supraventricular tachycardia.",
            "70F on hydrochlorothiazide, presenting with chest pain.",
            "Patient with cough, cardiopulmonary examination unremarkable.",
            "55 year old male with atrioventricular block and bradycardia, HR 38.",
            "Patient with cerebrovascular disease history, acute weakness in left arm.",
        ] {
            assert!(validate_note(note).is_ok(), "rejected: {note}");
        }
    }

    #[test]
    fn random_long_runs_do_not_split_into_word_parts() {
        assert!(!is_clinical_term("asdfghjklqwertyuiop"));
        assert!(!is_clinical_term("zzqxvbnmkjhgfdsap"));
        assert!(is_clinical_term("supraventricular"));
        assert!(is_clinical_term("cardiopulmonary"));
    }

    #[test]
    fn repeated_characters_are_gibberish() {
        let err = validate_note("patient has chest painnnnnn since morning").unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::Gibberish);
    }

    #[test]
    fn consonant_prefix_is_gibberish() {
        assert!(detect_gibberish("bcdfghjklm chest pain in patient").is_some());
        assert!(detect_gibberish("12/03/2024 patient with chest pain").is_none());
    }

    #[test]
    fn special_character_flood_is_gibberish() {
        assert!(detect_gibberish("pain #### $$$$ @@@@ %%%% ^^^^ &&&& **** (((( ))))").is_some());
    }

    #[test]
    fn rejects_non_medical_text() {
        let err = validate_note("The quick brown fox jumps over the lazy dog today.").unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::NotMedical);
    }

    #[test]
    fn single_letter_keywords_need_word_boundaries() {
        assert_eq!(medical_keyword_count("summer afternoon"), 0);
        assert_eq!(medical_keyword_count("58 M with cough"), 2);
    }
}
