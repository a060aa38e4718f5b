//! Rule-based 0-10 symptom severity. No model calls.

use std::sync::LazyLock;

use regex::Regex;

use super::contains_word;
use crate::models::{AtomicSymptom, ExtractedFindings};
use crate::pipeline::extraction::rules::expand_abbreviations;

// ═══════════════════════════════════════════════════════════
// Tables
// ═══════════════════════════════════════════════════════════

/// Level 0 is only read from the symptom's own descriptors so that an
/// unrelated "no" in the same sentence cannot zero a symptom.
const SEVERITY_KEYWORDS: &[(u8, &[&str])] = &[
    (10, &["worst", "excruciating", "unbearable", "catastrophic", "worst ever"]),
    (9, &["severe", "very severe", "extremely painful", "intense"]),
    (8, &["very painful", "very bad"]),
    (7, &["significant", "considerable", "quite bad"]),
    (6, &["moderate to severe"]),
    (5, &["moderate", "medium"]),
    (4, &["mild to moderate", "some"]),
    (3, &["mild", "slight"]),
    (2, &["minimal", "very mild", "barely"]),
    (1, &["trace", "negligible"]),
    (0, &["none", "absent", "no"]),
];

const HIGH_PRIORITY_SYMPTOMS: &[&str] = &[
    "chest pain",
    "shortness of breath",
    "confusion",
    "loss of consciousness",
    "severe headache",
    "abdominal pain",
    "hemoptysis",
    "syncope",
];

const HIGH_PRIORITY_DEFAULT: u8 = 7;
const CHIEF_COMPLAINT_DEFAULT: u8 = 6;
const DEFAULT_SEVERITY: u8 = 5;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

static PAIN_SCALE: LazyLock<Regex> = LazyLock::new(|| re(r"\b(\d{1,2})\s*(?:/|out of)\s*10\b"));

static TEMPERATURE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(r"(\d{2,3}(?:\.\d+)?)\s*°?\s*f\b"),
        re(r"(\d{2}(?:\.\d+)?)\s*°?\s*c\b"),
        re(r"temp(?:erature)?:?\s*(\d{2,3}(?:\.\d+)?)"),
        re(r"\bt:?\s*(\d{2,3}(?:\.\d+)?)"),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymptomRule {
    ChestPain,
    Pain,
    Respiratory,
    Cough,
    Fever,
    Neuro,
    Gastrointestinal,
}

fn rule_for(base: &str) -> Option<SymptomRule> {
    Some(match base {
        "chest pain" => SymptomRule::ChestPain,
        "abdominal pain" | "headache" | "back pain" => SymptomRule::Pain,
        "shortness of breath" | "dyspnea" => SymptomRule::Respiratory,
        "cough" => SymptomRule::Cough,
        "fever" => SymptomRule::Fever,
        "dizziness" | "confusion" | "weakness" => SymptomRule::Neuro,
        "nausea" | "vomiting" | "diarrhea" => SymptomRule::Gastrointestinal,
        _ => return None,
    })
}

// ═══════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════

/// Severity for one symptom on a 0-10 scale.
///
/// A valid severity already on the symptom wins. Otherwise a symptom-specific
/// rule runs, then the keyword table and `N/10` ratings, then a default that
/// favours high-priority symptoms and the chief complaint.
pub fn calculate_severity(symptom: &AtomicSymptom, note: &str, is_chief_complaint: bool) -> u8 {
    if let Some(existing) = symptom.severity {
        if (0.0..=10.0).contains(&existing) {
            return existing.trunc() as u8;
        }
    }

    let base = symptom.base_symptom.trim().to_lowercase();
    let text = SymptomText::new(symptom, note, &base);

    if let Some(rule) = rule_for(&base) {
        let severity = match rule {
            SymptomRule::ChestPain => chest_pain_severity(symptom, &text),
            SymptomRule::Pain => pain_severity(&text),
            SymptomRule::Respiratory => respiratory_severity(&text),
            SymptomRule::Cough => cough_severity(&text),
            SymptomRule::Fever => fever_severity(&text),
            SymptomRule::Neuro => neuro_severity(&base, &text),
            SymptomRule::Gastrointestinal => gi_severity(&text),
        };
        tracing::debug!(symptom = %base, severity, ?rule, "Rule-based severity");
        return severity;
    }

    if let Some(severity) = keyword_severity(&text) {
        tracing::debug!(symptom = %base, severity, "Keyword severity");
        return severity;
    }

    default_severity(&base, is_chief_complaint)
}

/// Fill in severity for every extracted symptom that lacks one. The first
/// symptom, or the one named as chief complaint, gets the chief default.
pub fn apply_severities(findings: &mut ExtractedFindings, note: &str) {
    let chief = findings.chief_complaint.as_deref().map(str::to_lowercase);
    for (index, symptom) in findings.atomic_symptoms.iter_mut().enumerate() {
        let is_chief = index == 0
            || chief
                .as_deref()
                .is_some_and(|c| c == symptom.base_symptom.to_lowercase());
        let severity = calculate_severity(symptom, note, is_chief);
        symptom.severity = Some(f64::from(severity));
    }
}

// ═══════════════════════════════════════════════════════════
// Text gathering
// ═══════════════════════════════════════════════════════════

struct SymptomText {
    quality: String,
    radiation: String,
    timing: String,
    frequency: String,
    /// All modifiers of the symptom, lowercased.
    descriptors: String,
    /// Sentences of the note that mention the symptom.
    context: String,
    /// Whole note, lowercased.
    note: String,
}

impl SymptomText {
    fn new(symptom: &AtomicSymptom, note: &str, base: &str) -> Self {
        let lower = |v: &Option<String>| v.as_deref().unwrap_or_default().to_lowercase();
        let quality = lower(&symptom.quality);
        let radiation = lower(&symptom.radiation);
        let timing = lower(&symptom.timing);
        let frequency = lower(&symptom.frequency);
        let descriptors = [
            quality.as_str(),
            radiation.as_str(),
            timing.as_str(),
            frequency.as_str(),
            &lower(&symptom.location),
            &lower(&symptom.duration),
            &lower(&symptom.progression),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

        let note = expand_abbreviations(note).to_lowercase();
        let context = note
            .split(['\n', ';', '!', '?'])
            .flat_map(|s| s.split(". "))
            .filter(|s| !base.is_empty() && s.contains(base))
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            quality,
            radiation,
            timing,
            frequency,
            descriptors,
            context,
            note,
        }
    }
}

/// `N/10` rating, else the most specific matching severity phrase.
fn keyword_severity(text: &SymptomText) -> Option<u8> {
    let combined = format!("{} {}", text.descriptors, text.context);

    if let Some(caps) = PAIN_SCALE.captures(&combined) {
        if let Ok(score) = caps[1].parse::<u8>() {
            if score <= 10 {
                return Some(score);
            }
        }
    }

    SEVERITY_KEYWORDS
        .iter()
        .flat_map(|(level, words)| words.iter().map(move |w| (*level, *w)))
        .filter(|(level, word)| {
            let haystack = if *level == 0 { &text.descriptors } else { &combined };
            contains_word(haystack, word)
        })
        .max_by_key(|(level, word)| (word.len(), *level))
        .map(|(level, _)| level)
}

// ═══════════════════════════════════════════════════════════
// Symptom-specific rules
// ═══════════════════════════════════════════════════════════

fn chest_pain_severity(symptom: &AtomicSymptom, text: &SymptomText) -> u8 {
    if let Some(s) = keyword_severity(text) {
        return s;
    }
    let q = &text.quality;
    let mut severity = if ["crushing", "pressure", "squeezing"].iter().any(|w| q.contains(w)) {
        8
    } else if ["sharp", "stabbing", "tearing"].iter().any(|w| q.contains(w)) {
        7
    } else if ["burning", "aching"].iter().any(|w| q.contains(w)) {
        5
    } else if q.contains("dull") {
        4
    } else {
        5
    };
    let radiates = symptom.radiation.is_some()
        && ["arm", "jaw", "back", "shoulder"]
            .iter()
            .any(|loc| text.radiation.contains(loc));
    if radiates {
        severity = (severity + 2).min(10);
    }
    severity
}

fn pain_severity(text: &SymptomText) -> u8 {
    if let Some(s) = keyword_severity(text) {
        return s;
    }
    let q = &text.quality;
    if ["severe", "intense", "excruciating"].iter().any(|w| q.contains(w)) {
        8
    } else if ["sharp", "stabbing"].iter().any(|w| q.contains(w)) {
        7
    } else if q.contains("moderate") {
        5
    } else if ["mild", "dull"].iter().any(|w| q.contains(w)) {
        3
    } else {
        5
    }
}

/// Graded by the exertion that brings it on.
fn respiratory_severity(text: &SymptomText) -> u8 {
    if let Some(s) = keyword_severity(text) {
        return s;
    }
    let (timing, context) = (&text.timing, &text.context);
    if timing.contains("at rest") || context.contains("at rest") {
        9
    } else if timing.contains("minimal exertion") || context.contains("minimal activity") {
        7
    } else if timing.contains("moderate exertion") || context.contains("walking") {
        5
    } else if timing.contains("severe exertion") || context.contains("heavy activity") {
        3
    } else {
        6
    }
}

fn cough_severity(text: &SymptomText) -> u8 {
    if let Some(s) = keyword_severity(text) {
        return s;
    }
    let q = &text.quality;
    let mut severity = 4;
    if q.contains("productive") || q.contains("hemoptysis") {
        severity = 6;
    }
    if q.contains("blood") {
        severity = 9;
    }
    let f = &text.frequency;
    if f.contains("constant") || f.contains("continuous") {
        severity = (severity + 2).min(10);
    } else if f.contains("frequent") {
        severity = (severity + 1).min(10);
    }
    severity
}

/// Banded by the first recognisable temperature. Readings above 50 are
/// taken as Fahrenheit.
fn fever_severity(text: &SymptomText) -> u8 {
    let combined = format!("{} {}", text.quality, text.note);
    for pattern in TEMPERATURE_PATTERNS.iter() {
        let Some(temp) = pattern
            .captures(&combined)
            .and_then(|c| c[1].parse::<f64>().ok())
        else {
            continue;
        };
        let band = if temp > 50.0 {
            match temp {
                t if t >= 104.0 => Some(9),
                t if t >= 102.0 => Some(7),
                t if t >= 100.4 => Some(5),
                t if t >= 99.0 => Some(3),
                _ => None,
            }
        } else {
            match temp {
                t if t >= 40.0 => Some(9),
                t if t >= 39.0 => Some(7),
                t if t >= 38.0 => Some(5),
                t if t >= 37.5 => Some(3),
                _ => None,
            }
        };
        if let Some(severity) = band {
            return severity;
        }
    }

    if text.quality.contains("high") {
        7
    } else if text.quality.contains("low grade") {
        3
    } else {
        5
    }
}

fn neuro_severity(base: &str, text: &SymptomText) -> u8 {
    if let Some(s) = keyword_severity(text) {
        return s;
    }
    let q = &text.quality;
    if base.contains("confusion") || q.contains("altered") {
        8
    } else if q.contains("vertigo") || q.contains("severe") {
        7
    } else if q.contains("mild") || q.contains("slight") {
        3
    } else {
        5
    }
}

fn gi_severity(text: &SymptomText) -> u8 {
    if let Some(s) = keyword_severity(text) {
        return s;
    }
    let (f, q) = (&text.frequency, &text.quality);
    if q.contains("blood") {
        return 9;
    }
    if q.contains("bile") || q.contains("bilious") {
        return 7;
    }
    if f.contains("continuous") || f.contains("constant") {
        7
    } else if f.contains("frequent") || f.contains("multiple") {
        6
    } else if f.contains("occasional") {
        3
    } else {
        4
    }
}

fn default_severity(base: &str, is_chief_complaint: bool) -> u8 {
    if HIGH_PRIORITY_SYMPTOMS.iter().any(|s| base.contains(s)) {
        HIGH_PRIORITY_DEFAULT
    } else if is_chief_complaint {
        CHIEF_COMPLAINT_DEFAULT
    } else {
        DEFAULT_SEVERITY
    }
}
