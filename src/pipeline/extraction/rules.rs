//! Deterministic extractor used when no LLM is configured or the LLM reply
//! cannot be used. Works clause by clause so negation cues only cover the
//! text that follows them.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{
    AtomicSymptom, Demographics, ExtractedFindings, LabValues, Negation, Sex, VitalSigns,
};

// ═══════════════════════════════════════════════════════════
// Lexicons
// ═══════════════════════════════════════════════════════════

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

static ABBREVIATIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (re(r"\bSOB\b"), "shortness of breath"),
        (re(r"\bDOE\b"), "shortness of breath on exertion"),
        (re(r"\bCP\b"), "chest pain"),
        (re(r"(?i)\bN/V\b"), "nausea, vomiting"),
        (re(r"\bHTN\b"), "hypertension"),
        (re(r"\bDM2?\b"), "diabetes"),
        (re(r"\bT2DM\b"), "diabetes"),
        (re(r"\bHLD\b"), "hyperlipidemia"),
        (re(r"\bCAD\b"), "coronary artery disease"),
        (re(r"\bMI\b"), "myocardial infarction"),
        (re(r"\bDVT\b"), "deep vein thrombosis"),
        (re(r"(?i)\bc/o\b"), "complains of"),
        (re(r"(?i)\bh/o\b"), "history of"),
        (re(r"(?i)\bhx\b"), "history"),
        (re(r"(?i)\bpt\b"), "patient"),
        (re(r"(?i)(\d)\s*-?\s*y/?o\b"), "${1} year old"),
    ]
});

/// Base symptom → surface forms. Order decides chief complaint when several
/// symptoms share a sentence.
static SYMPTOMS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    const PAIN_WORD: &str = r"(?:pain|pressure|discomfort|tightness|heaviness|ache|burning)";
    vec![
        (
            "chest pain",
            re(&format!(
                r"(?i)\bchest\s+(?:\w+\s+)?{PAIN_WORD}|{PAIN_WORD}\s+(?:\w+\s+){{0,2}}(?:in|of|across)\s+(?:the\s+|his\s+|her\s+)?chest\b|\b(?:substernal|retrosternal)\s+{PAIN_WORD}|\bangina\b"
            )),
        ),
        (
            "abdominal pain",
            re(r"(?i)\b(?:abdominal|abdomen|stomach|belly|epigastric)\s+(?:\w+\s+)?(?:pain|discomfort|cramps?|cramping|ache|burning)|(?:pain|discomfort|cramping|burning)\s+(?:\w+\s+){0,2}(?:in|of)\s+(?:the\s+)?(?:abdomen|stomach|epigastrium|belly)\b"),
        ),
        ("back pain", re(r"(?i)\bback\s+pain\b|\bpain\s+(?:\w+\s+){0,2}in\s+(?:the\s+|his\s+|her\s+)?back\b")),
        ("headache", re(r"(?i)\bheadaches?\b|\bcephalgia\b")),
        ("arm pain", re(r"(?i)\barm\s+pain\b")),
        ("jaw pain", re(r"(?i)\bjaw\s+pain\b")),
        ("shortness of breath", re(r"(?i)\bshortness of breath\b|\bshort of breath\b|\bdyspn(?:ea|oea|eic)\b|\bbreathless(?:ness)?\b|\bdifficulty breathing\b")),
        ("coughing up blood", re(r"(?i)\bhemoptysis\b|\bcoughing up blood\b")),
        ("cough", re(r"(?i)\bcough(?:s|ing)?\b")),
        ("wheezing", re(r"(?i)\bwheez(?:e|es|ing)\b")),
        ("fever", re(r"(?i)\bfevers?\b|\bfebrile\b|\bpyrexia\b")),
        ("chills", re(r"(?i)\bchills\b|\brigors\b")),
        ("sweating", re(r"(?i)\bsweat(?:ing|y|s)?\b|\bdiaphore(?:sis|tic)\b")),
        ("nausea", re(r"(?i)\bnause(?:a|ated|ous)\b")),
        ("vomiting", re(r"(?i)\bvomit(?:ing|ed|s)?\b|\bemesis\b")),
        ("diarrhea", re(r"(?i)\bdiarrh(?:ea|oea)\b|\bloose stools\b")),
        ("constipation", re(r"(?i)\bconstipat(?:ion|ed)\b")),
        ("heartburn", re(r"(?i)\bheartburn\b")),
        ("regurgitation", re(r"(?i)\bregurgitat\w*\b|\bacid reflux\b")),
        ("sour taste", re(r"(?i)\b(?:sour|acid|acidic|bitter)\s+taste\b")),
        ("belching", re(r"(?i)\bbelch(?:ing|es)?\b|\beructation\b|\bburping\b")),
        ("difficulty swallowing", re(r"(?i)\bdysphagia\b|\bdifficulty swallowing\b")),
        ("palpitations", re(r"(?i)\bpalpitations?\b|\bheart racing\b|\bracing heart\b")),
        ("dizziness", re(r"(?i)\bdizz(?:y|iness)\b|\blight-?headed(?:ness)?\b|\bvertigo\b")),
        ("fainting", re(r"(?i)\bsyncop(?:e|al)\b|\bfaint(?:ed|ing)?\b|\bpassed out\b")),
        ("fatigue", re(r"(?i)\bfatigued?\b|\btired(?:ness)?\b|\bexhaust(?:ed|ion)\b|\bmalaise\b")),
        ("weakness", re(r"(?i)\bweak(?:ness)?\b")),
        (
            "leg swelling",
            re(r"(?i)\b(?:leg|calf|ankle|pedal)\s+(?:swelling|edema|oedema)\b|\bswollen\s+(?:left\s+|right\s+)?(?:leg|calf|ankle)s?\b|\bswelling\s+(?:of|in)\s+(?:the\s+)?(?:left\s+|right\s+)?(?:leg|calf|ankle)\b"),
        ),
        ("sore throat", re(r"(?i)\bsore throat\b")),
        ("nasal congestion", re(r"(?i)\bnasal congestion\b|\bstuffy nose\b|\bcongested\b")),
        ("anxiety", re(r"(?i)\banxi(?:ety|ous)\b|\bnervous(?:ness)?\b")),
    ]
});

/// Findings that only make sense when denied ("no radiation").
static NEGATION_ONLY: LazyLock<Vec<(&'static str, Regex)>> =
    LazyLock::new(|| vec![("radiation", re(r"(?i)\bradiat\w*\b"))]);

/// Symptoms that carry quality/location/radiation modifiers.
const PAIN_SYMPTOMS: &[&str] = &["chest pain", "abdominal pain", "back pain", "headache"];

static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| re(r"[.;!?]+(?:\s+|$)|\n+"));
static NEGATION_CUE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:denies|denied|denying|no|not|without|absent|negative for|free of)\b")
});
static SCOPE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(?:but|however|although|though|except|yet)\b"));

static QUALITY: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(burning|crushing|squeezing|pressure(?:-like)?|tightness|heaviness|sharp|stabbing|dull|aching|tearing|ripping|pleuritic|throbbing|cramping)\b")
});
static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(substernal|retrosternal|epigastric|central|left[- ]sided|right[- ]sided|left|right|upper|lower|diffuse)\b")
});
static RADIATION: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\bradiat\w*\s+(?:to|into|down|towards?)\s+(?:the\s+|his\s+|her\s+)?((?:left\s+|right\s+)?(?:arm|jaw|back|neck|shoulder)s?(?:\s+and\s+(?:left\s+|right\s+)?(?:arm|jaw|back|neck|shoulder)s?)?)")
});
static SEVERITY: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(\d{1,2})\s*(?:/|out of)\s*10\b"));
static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:for|x|since|over the (?:past|last))\s*(\d+(?:\.\d+)?\s*(?:minutes?|mins?|hours?|hrs?|h|days?|d|weeks?|wks?|w|months?|mo|years?|yrs?))\b|\b(\d+\s*(?:minutes?|hours?|days?|weeks?|months?|years?))\s+ago\b")
});

static AGE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(\d{1,3})\s*(?:-|\s)?(?:years?|yrs?)(?:\s*-?\s*old)?\b"));
static COMPACT_AGE_SEX: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?:^|[^\d.])(\d{1,2})\s?([MF])\b"));
static SEX_AFTER_AGE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i:\byears?\s*-?\s*old)\s+([MF])\b"));
static MALE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(?:male|man|gentleman|boy)\b"));
static FEMALE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(?:female|woman|lady|girl)\b"));

static HEART_RATE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(?:hr|heart rate|pulse)\s*(?:of|is|was)?\s*[:=]?\s*(\d{2,3})\b"));
static BLOOD_PRESSURE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:bp|blood pressure)\s*(?:of|is|was)?\s*[:=]?\s*(\d{2,3})\s*/\s*(\d{2,3})")
});
static RESP_RATE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:rr|resp(?:iratory)?\s+rate|resp)\s*(?:of|is|was)?\s*[:=]?\s*(\d{1,2})\b")
});
static TEMPERATURE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:temp(?:erature)?|t)\s*(?:of|is|was)?\s*[:=]?\s*(\d{2,3}(?:\.\d+)?)")
});
static SPO2: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:spo2|sp02|o2\s*sat(?:uration)?s?|sat(?:uration)?s?|oxygen saturation|o2)\s*(?:of|is|was)?\s*[:=]?\s*(\d{2,3})\s*%?|\b(\d{2,3})\s*%\s*(?:on\s+)?(?:ra|room air)\b")
});
static TROPONIN: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\btroponin(?:\s*[it])?\s*(?:level)?\s*(?:is|was|of)?\s*[:=]?\s*(\d+(?:\.\d+)?|negative|normal|undetectable|positive|elevated|raised)")
});
static D_DIMER: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\bd-?dimer\s*(?:is|was|of)?\s*[:=]?\s*(\d+(?:\.\d+)?|negative|normal|positive|elevated|raised)")
});
static WBC: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\bwbc\s*(?:is|was|of)?\s*[:=]?\s*(\d+(?:\.\d+)?)"));
static BNP: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\bbnp\s*(?:is|was|of)?\s*[:=]?\s*(\d+(?:\.\d+)?)"));

/// Label, is-past-history, pattern.
static RISK_FACTORS: LazyLock<Vec<(&'static str, bool, Regex)>> = LazyLock::new(|| {
    vec![
        ("hypertension", true, re(r"(?i)\bhypertension\b|\bhigh blood pressure\b")),
        ("diabetes", true, re(r"(?i)\bdiabet(?:es|ic)\b")),
        ("smoking", false, re(r"(?i)\bsmok(?:er|es|ing)\b|\btobacco\b|\bpack[- ]years?\b")),
        ("hyperlipidemia", true, re(r"(?i)\bhyperlipid(?:a)?emia\b|\bhypercholesterol(?:a)?emia\b|\bhigh cholesterol\b|\bdyslipid(?:a)?emia\b")),
        ("obesity", false, re(r"(?i)\bobes(?:e|ity)\b")),
        ("family history of heart disease", false, re(r"(?i)\bfamily history\b")),
        ("coronary artery disease", true, re(r"(?i)\bcoronary artery disease\b")),
        ("prior MI", true, re(r"(?i)\b(?:prior|previous|past|old|history of)\s+(?:\w+\s+)?(?:myocardial infarction|heart attack|n?stemi)\b")),
        ("prior DVT/PE", true, re(r"(?i)\b(?:prior|previous|past|history of)\s+(?:\w+\s+)?(?:deep vein thrombosis|pulmonary embolism|blood clots?|pe)\b")),
        ("recent surgery", false, re(r"(?i)\brecent(?:ly)?\s+(?:\w+\s+)?(?:surgery|operation)\b|\bpost-?op(?:erative)?\b|\bsurgery\s+\d+\s+(?:days?|weeks?)\s+ago\b")),
        ("immobilization", false, re(r"(?i)\bimmobili[sz](?:ed|ation)\b|\bbed-?(?:ridden|bound)\b|\blong(?:-haul)?\s+(?:flight|car ride|drive)\b")),
        ("cancer", true, re(r"(?i)\bcancer\b|\bmalignancy\b|\bchemotherapy\b|\bmetasta\w*\b")),
        ("oral contraceptive use", false, re(r"(?i)\boral contraceptives?\b|\bbirth control\b|\bocps?\b")),
    ]
});

static TRIGGERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("exertion", re(r"(?i)\bexertion(?:al)?\b|\bclimbing stairs\b|\bwalking uphill\b")),
        ("exercise", re(r"(?i)\bexercis(?:e|ing)\b")),
        ("emotional stress", re(r"(?i)\b(?:emotional\s+)?stress\b")),
        ("activity", re(r"(?i)\bphysical activity\b")),
        ("meals", re(r"(?i)\b(?:after|with|following)\s+(?:large\s+|heavy\s+|spicy\s+|fatty\s+)?(?:meals?|eating|food)\b|\bpostprandial\b|\bspicy food\b")),
        ("lying down", re(r"(?i)\blying\s+(?:down|flat|supine)\b|\bwhen\s+(?:he|she)\s+lies\s+down\b|\brecumbent\b")),
        ("bending", re(r"(?i)\bbending\b")),
        ("deep breathing", re(r"(?i)\bdeep (?:breathing|breath|inspiration)\b")),
    ]
});

static RELIEVING: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("rest", re(r"(?i)\b(?:relieved|improves?|improved|better|eased|resolves?|resolved|settles?)\s+(?:\w+\s+)?(?:with|by|on|after|at)\s+rest\b")),
        ("antacids", re(r"(?i)\bantacids?\b|\btums\b|\bgaviscon\b")),
        ("nitroglycerin", re(r"(?i)\bnitroglycerin\b|\bnitro\b|\bgtn\b")),
        ("sitting up", re(r"(?i)\bsitting (?:up|forward)\b|\bleaning forward\b")),
    ]
});

static TEMPORAL: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("sudden onset", re(r"(?i)\bsudden(?:ly)?\b|\babrupt(?:ly)?\b")),
        ("acute", re(r"(?i)\bacute(?:ly)?\b")),
        ("gradual onset", re(r"(?i)\bgradual(?:ly)?\b|\binsidious\b")),
        ("intermittent", re(r"(?i)\bintermittent(?:ly)?\b|\bepisodic\b|\bcomes and goes\b")),
        ("chronic", re(r"(?i)\bchronic\b|\blong-?standing\b")),
    ]
});

static EXAM_FINDING: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:exam|examination|auscultation|crackles|rales|rhonchi|murmur|jvd|jugular venous|tender(?:ness)?|decreased breath sounds|clammy|pale|ecg|ekg|st elevation|st depression)\b")
});

const MEDICATIONS: &[&str] = &[
    "aspirin", "clopidogrel", "metformin", "insulin", "lisinopril", "amlodipine", "losartan",
    "atorvastatin", "simvastatin", "rosuvastatin", "metoprolol", "atenolol", "warfarin",
    "apixaban", "rivaroxaban", "heparin", "omeprazole", "pantoprazole", "ranitidine",
    "albuterol", "ibuprofen", "naproxen", "furosemide", "levothyroxine", "prednisone",
];

// ═══════════════════════════════════════════════════════════
// Extraction
// ═══════════════════════════════════════════════════════════

/// Rule-based findings. Never fails; an unrecognized note yields empty
/// findings flagged with `extracted_by_rules`.
pub fn extract_with_rules(note: &str) -> ExtractedFindings {
    let text = expand_abbreviations(note);
    let mut findings = ExtractedFindings {
        demographics: extract_demographics(&text),
        vital_signs: extract_vitals(&text),
        labs: extract_labs(&text),
        extracted_by_rules: true,
        ..Default::default()
    };

    let mut positive_text = Vec::new();
    for sentence in SENTENCE_BREAK.split(&text) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        let modifiers = SentenceModifiers::parse(sentence);
        let mut first_in_sentence = true;
        for (clause, negated) in clause_polarity(sentence) {
            if negated {
                collect_negations(clause, &mut findings.negations);
                continue;
            }
            positive_text.push(clause);
            for (base, pattern) in SYMPTOMS.iter() {
                if !pattern.is_match(clause) {
                    continue;
                }
                let symptom = modifiers.apply(base, first_in_sentence);
                first_in_sentence = false;
                merge_symptom(&mut findings.atomic_symptoms, symptom);
            }
        }

        if EXAM_FINDING.is_match(sentence) {
            findings.physical_exam.push(sentence.to_string());
        }
    }

    // A symptom asserted anywhere outranks a denial elsewhere.
    let present: Vec<String> = findings
        .atomic_symptoms
        .iter()
        .map(|s| s.base_symptom.clone())
        .collect();
    findings.negations.retain(|n| !present.contains(&n.base_symptom));

    let positive = positive_text.join(". ");
    for (label, is_history, pattern) in RISK_FACTORS.iter() {
        if pattern.is_match(&positive) {
            findings.risk_factors.push(label.to_string());
            if *is_history {
                findings.past_medical_history.push(label.to_string());
            }
        }
    }
    findings.triggers = matched_labels(&TRIGGERS, &positive)
        .into_iter()
        .filter(|t| *t != "emotional stress" || !positive.to_lowercase().contains("stress test"))
        .map(str::to_string)
        .collect();
    findings.relieving_factors = matched_labels(&RELIEVING, &positive)
        .into_iter()
        .map(str::to_string)
        .collect();
    findings.temporal_pattern = temporal_pattern(&text);

    let lower = positive.to_lowercase();
    findings.medications = MEDICATIONS
        .iter()
        .filter(|m| lower.contains(*m))
        .map(|m| m.to_string())
        .collect();

    findings.chief_complaint = findings.atomic_symptoms.first().map(|s| s.base_symptom.clone());
    findings.confidence_notes = Some("Extracted by rule-based fallback".to_string());

    tracing::debug!(
        symptoms = findings.atomic_symptoms.len(),
        negations = findings.negations.len(),
        risk_factors = findings.risk_factors.len(),
        vitals = findings.vital_signs.recorded_count(),
        "Rule-based extraction complete"
    );
    findings
}

/// Expand common clinical shorthand in place.
pub fn expand_abbreviations(note: &str) -> String {
    ABBREVIATIONS
        .iter()
        .fold(note.to_string(), |text, (pattern, replacement)| {
            pattern.replace_all(&text, *replacement).into_owned()
        })
}

/// Split a sentence into (clause, negated) pieces. A negation cue covers
/// the text after it up to a contrastive break ("but", "however").
pub fn clause_polarity(sentence: &str) -> Vec<(&str, bool)> {
    let mut parts = Vec::new();
    let mut rest = sentence;
    while let Some(cue) = NEGATION_CUE.find(rest) {
        parts.push((&rest[..cue.start()], false));
        let scoped = &rest[cue.start()..];
        let end = SCOPE_BREAK
            .find(scoped)
            .map(|m| m.start())
            .unwrap_or(scoped.len());
        parts.push((&scoped[..end], true));
        rest = &scoped[end..];
    }
    parts.push((rest, false));
    parts.retain(|(clause, _)| !clause.trim().is_empty());
    parts
}

fn collect_negations(clause: &str, negations: &mut Vec<Negation>) {
    let lower = clause.trim_start().to_lowercase();
    let negation_type = if lower.starts_with("den") { "denied" } else { "absent" };
    for (base, pattern) in SYMPTOMS.iter().chain(NEGATION_ONLY.iter()) {
        if pattern.is_match(clause) && !negations.iter().any(|n| n.base_symptom == *base) {
            negations.push(Negation {
                base_symptom: base.to_string(),
                negation_type: negation_type.to_string(),
                exact_phrase: clause.trim().to_string(),
            });
        }
    }
}

fn merge_symptom(symptoms: &mut Vec<AtomicSymptom>, new: AtomicSymptom) {
    match symptoms.iter_mut().find(|s| s.base_symptom == new.base_symptom) {
        Some(existing) => {
            existing.quality = existing.quality.take().or(new.quality);
            existing.location = existing.location.take().or(new.location);
            existing.radiation = existing.radiation.take().or(new.radiation);
            existing.severity = existing.severity.or(new.severity);
            existing.duration = existing.duration.take().or(new.duration);
        }
        None => symptoms.push(new),
    }
}

/// Modifiers found anywhere in one sentence.
#[derive(Debug, Default)]
struct SentenceModifiers {
    quality: Option<String>,
    location: Option<String>,
    radiation: Option<String>,
    severity: Option<f64>,
    duration: Option<String>,
}

impl SentenceModifiers {
    fn parse(sentence: &str) -> Self {
        let radiation = RADIATION
            .captures(sentence)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_lowercase());
        // "radiating to the left arm" must not read as a left-sided location
        let without_radiation = RADIATION.replace_all(sentence, "");

        Self {
            quality: QUALITY.captures(sentence).map(|c| {
                let q = c[1].to_lowercase();
                q.trim_end_matches("-like").to_string()
            }),
            location: LOCATION.captures(&without_radiation).map(|c| {
                match c[1].to_lowercase().as_str() {
                    "retrosternal" => "substernal".to_string(),
                    other => other.replace("-sided", "").replace(" sided", ""),
                }
            }),
            radiation,
            severity: SEVERITY
                .captures(sentence)
                .and_then(|c| c[1].parse::<f64>().ok())
                .filter(|v| *v <= 10.0),
            duration: DURATION.captures(sentence).and_then(|c| {
                c.get(1)
                    .or_else(|| c.get(2))
                    .map(|m| m.as_str().to_lowercase())
            }),
        }
    }

    fn apply(&self, base: &str, first_in_sentence: bool) -> AtomicSymptom {
        let mut symptom = AtomicSymptom::named(base);
        if PAIN_SYMPTOMS.contains(&base) {
            symptom.quality = self.quality.clone();
            if base != "headache" {
                symptom.location = self.location.clone();
                symptom.radiation = self.radiation.clone();
            }
        }
        if first_in_sentence {
            symptom.severity = self.severity;
            symptom.duration = self.duration.clone();
        }
        symptom
    }
}

pub fn extract_demographics(text: &str) -> Demographics {
    let mut demographics = Demographics::default();

    if let Some(c) = AGE.captures(text) {
        demographics.age = c[1].parse().ok().filter(|a| *a <= 120);
    }
    // "58M" style headers; only trusted near the start of the note
    if let Some(c) = COMPACT_AGE_SEX.captures(text) {
        if c.get(0).map(|m| m.start()).unwrap_or(usize::MAX) < 40 {
            if demographics.age.is_none() {
                demographics.age = c[1].parse().ok();
            }
            demographics.sex = Some(if &c[2] == "M" { Sex::Male } else { Sex::Female });
        }
    }
    if demographics.sex.is_none() {
        if let Some(c) = SEX_AFTER_AGE.captures(text) {
            demographics.sex = Some(if &c[1] == "M" { Sex::Male } else { Sex::Female });
        }
    }
    if demographics.sex.is_none() {
        let male = MALE.find(text).map(|m| m.start());
        let female = FEMALE.find(text).map(|m| m.start());
        demographics.sex = match (male, female) {
            (Some(m), Some(f)) => Some(if m < f { Sex::Male } else { Sex::Female }),
            (Some(_), None) => Some(Sex::Male),
            (None, Some(_)) => Some(Sex::Female),
            (None, None) => None,
        };
    }
    demographics
}

fn capture_number(pattern: &Regex, text: &str) -> Option<f64> {
    let caps = pattern.captures(text)?;
    caps.iter()
        .skip(1)
        .flatten()
        .next()
        .and_then(|m| m.as_str().parse().ok())
}

pub fn extract_vitals(text: &str) -> VitalSigns {
    let (systolic_bp, diastolic_bp) = BLOOD_PRESSURE
        .captures(text)
        .map(|c| (c[1].parse().ok(), c[2].parse().ok()))
        .unwrap_or((None, None));

    VitalSigns {
        heart_rate: capture_number(&HEART_RATE, text).filter(|v| (20.0..=300.0).contains(v)),
        systolic_bp,
        diastolic_bp,
        respiratory_rate: capture_number(&RESP_RATE, text).filter(|v| (4.0..=80.0).contains(v)),
        temperature: capture_number(&TEMPERATURE, text).filter(|v| (30.0..=115.0).contains(v)),
        spo2: capture_number(&SPO2, text).filter(|v| (50.0..=100.0).contains(v)),
    }
}

/// Qualitative results map onto values either side of the 0.1 ng/mL cutoff.
fn lab_value(pattern: &Regex, text: &str) -> Option<f64> {
    let raw = pattern.captures(text)?.get(1)?.as_str().to_lowercase();
    match raw.as_str() {
        "negative" | "normal" | "undetectable" => Some(0.0),
        "positive" | "elevated" | "raised" => Some(0.5),
        number => number.parse().ok(),
    }
}

pub fn extract_labs(text: &str) -> LabValues {
    LabValues {
        troponin: lab_value(&TROPONIN, text),
        d_dimer: lab_value(&D_DIMER, text),
        wbc: capture_number(&WBC, text),
        bnp: capture_number(&BNP, text),
    }
}

fn matched_labels(table: &[(&'static str, Regex)], text: &str) -> Vec<&'static str> {
    table
        .iter()
        .filter(|(_, pattern)| pattern.is_match(text))
        .map(|(label, _)| *label)
        .collect()
}

fn temporal_pattern(text: &str) -> Option<String> {
    let mut parts: Vec<String> = matched_labels(&TEMPORAL, text)
        .into_iter()
        .map(str::to_string)
        .collect();
    if let Some(duration) = DURATION
        .captures(text)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
    {
        parts.push(duration.as_str().to_lowercase());
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACS_NOTE: &str = "58 y/o M with crushing substernal CP radiating to left arm, 8/10, \
        started 2 hours ago on exertion. Diaphoretic and nauseous. Denies fever or cough. \
        PMH: HTN, DM, smoker. BP 150/90, HR 110, RR 22, SpO2 94% on RA. Troponin 0.8.";

    const GERD_NOTE: &str = "38 year old female with burning chest pain after meals and when lying down. \
        Reports sour taste in mouth and frequent belching. Relieved by antacids. \
        No shortness of breath, no diaphoresis, no radiation.";

    fn bases(findings: &ExtractedFindings) -> Vec<&str> {
        findings
            .atomic_symptoms
            .iter()
            .map(|s| s.base_symptom.as_str())
            .collect()
    }

    #[test]
    fn abbreviations_expand() {
        let text = expand_abbreviations("Pt c/o SOB and CP, h/o HTN, N/V x2d, 45yo");
        assert!(text.contains("complains of shortness of breath and chest pain"));
        assert!(text.contains("history of hypertension"));
        assert!(text.contains("nausea, vomiting"));
        assert!(text.contains("45 year old"));
    }

    #[test]
    fn acs_note_symptoms_and_modifiers() {
        let findings = extract_with_rules(ACS_NOTE);
        assert!(findings.extracted_by_rules);
        assert_eq!(findings.demographics.age, Some(58));
        assert_eq!(findings.demographics.sex, Some(Sex::Male));

        let chest = &findings.atomic_symptoms[0];
        assert_eq!(chest.base_symptom, "chest pain");
        assert_eq!(chest.quality.as_deref(), Some("crushing"));
        assert_eq!(chest.location.as_deref(), Some("substernal"));
        assert_eq!(chest.radiation.as_deref(), Some("left arm"));
        assert_eq!(chest.severity, Some(8.0));
        assert_eq!(findings.chief_complaint.as_deref(), Some("chest pain"));

        let names = bases(&findings);
        assert!(names.contains(&"sweating"));
        assert!(names.contains(&"nausea"));
        assert!(!names.contains(&"fever"));
        assert!(!names.contains(&"cough"));
    }

    #[test]
    fn acs_note_negations_vitals_and_history() {
        let findings = extract_with_rules(ACS_NOTE);
        let negated = findings.negated_symptoms();
        assert!(negated.contains(&"fever".to_string()));
        assert!(negated.contains(&"cough".to_string()));
        assert_eq!(findings.negations[0].negation_type, "denied");

        assert_eq!(findings.vital_signs.systolic_bp, Some(150.0));
        assert_eq!(findings.vital_signs.diastolic_bp, Some(90.0));
        assert_eq!(findings.vital_signs.heart_rate, Some(110.0));
        assert_eq!(findings.vital_signs.respiratory_rate, Some(22.0));
        assert_eq!(findings.vital_signs.spo2, Some(94.0));
        assert_eq!(findings.labs.troponin, Some(0.8));

        for rf in ["hypertension", "diabetes", "smoking"] {
            assert!(findings.risk_factors.contains(&rf.to_string()), "missing {rf}");
        }
        assert!(findings.past_medical_history.contains(&"hypertension".to_string()));
        assert!(findings.triggers.contains(&"exertion".to_string()));
    }

    #[test]
    fn gerd_note_triggers_relief_and_negations() {
        let findings = extract_with_rules(GERD_NOTE);
        assert_eq!(findings.demographics.sex, Some(Sex::Female));
        assert_eq!(findings.demographics.age, Some(38));

        let chest = &findings.atomic_symptoms[0];
        assert_eq!(chest.base_symptom, "chest pain");
        assert_eq!(chest.quality.as_deref(), Some("burning"));

        let names = bases(&findings);
        assert!(names.contains(&"sour taste"));
        assert!(names.contains(&"belching"));

        assert_eq!(findings.triggers, vec!["meals", "lying down"]);
        assert_eq!(findings.relieving_factors, vec!["antacids"]);

        let negated = findings.negated_symptoms();
        assert!(negated.contains(&"shortness of breath".to_string()));
        assert!(negated.contains(&"sweating".to_string()));
        assert!(negated.contains(&"radiation".to_string()));
        assert_eq!(findings.negations[0].negation_type, "absent");
    }

    #[test]
    fn negation_scope_stops_at_contrast() {
        let parts = clause_polarity("Denies fever but reports cough");
        assert_eq!(parts, vec![("Denies fever ", true), ("but reports cough", false)]);

        let findings = extract_with_rules("Patient denies fever but reports productive cough for 3 days.");
        assert_eq!(bases(&findings), vec!["cough"]);
        assert_eq!(findings.negated_symptoms(), vec!["fever"]);
        assert_eq!(findings.atomic_symptoms[0].duration.as_deref(), Some("3 days"));
    }

    #[test]
    fn asserted_symptom_wins_over_denial() {
        let findings = extract_with_rules("Chest pain since morning. No chest pain at rest.");
        assert_eq!(bases(&findings), vec!["chest pain"]);
        assert!(findings.negations.is_empty());
    }

    #[test]
    fn compact_header_demographics() {
        let d = extract_demographics("45F presents with palpitations, temp 98.6F");
        assert_eq!(d.age, Some(45));
        assert_eq!(d.sex, Some(Sex::Female));
    }

    #[test]
    fn qualitative_troponin() {
        assert_eq!(extract_labs("troponin negative, d-dimer 850").troponin, Some(0.0));
        assert_eq!(extract_labs("troponin negative, d-dimer 850").d_dimer, Some(850.0));
        assert_eq!(extract_labs("troponin elevated").troponin, Some(0.5));
        assert!(extract_labs("no labs yet").is_empty());
    }

    #[test]
    fn temperature_and_temporal_pattern() {
        let findings = extract_with_rules("Sudden onset dyspnea. Temp 38.6, pulse 120.");
        assert_eq!(findings.vital_signs.temperature, Some(38.6));
        assert_eq!(findings.vital_signs.heart_rate, Some(120.0));
        assert_eq!(findings.temporal_pattern.as_deref(), Some("sudden onset"));
        assert_eq!(bases(&findings), vec!["shortness of breath"]);
    }
}
