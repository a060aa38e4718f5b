//! Synonym expansion. Two tables: one maps generic symptoms onto the exact
//! column headers of the symptom matrix, the other widens retrieval queries.

use std::collections::HashSet;

/// Generic symptom → symptom-matrix column variants. Matching against the
/// matrix stays exact; only these controlled variants are added.
const DATASET_SYNONYMS: &[(&str, &[&str])] = &[
    (
        "chest pain",
        &[
            "chest pain",
            "sharp chest pain",
            "burning chest pain",
            "central chest pain",
            "pressure-like chest pain",
            "dull chest pain",
            "stabbing chest pain",
        ],
    ),
    ("belching", &["belching", "frequent belching"]),
    ("taste disturbance", &["taste disturbance", "sour taste in mouth"]),
    ("sour taste", &["sour taste", "sour taste in mouth"]),
    ("heartburn", &["heartburn", "burning sensation"]),
    ("nausea", &["nausea", "feeling sick"]),
    ("vomiting", &["vomiting", "throwing up"]),
    (
        "shortness of breath",
        &["shortness of breath", "dyspnea", "difficulty breathing", "breathlessness"],
    ),
    ("cough", &["cough", "dry cough", "productive cough"]),
    (
        "abdominal pain",
        &["abdominal pain", "sharp abdominal pain", "dull abdominal pain", "cramping abdominal pain"],
    ),
    ("headache", &["headache", "sharp headache", "dull headache", "throbbing headache"]),
    ("palpitations", &["palpitations", "heart palpitations"]),
    ("sweating", &["sweating", "diaphoresis", "excessive sweating"]),
    ("dizziness", &["dizziness", "lightheadedness", "vertigo"]),
    ("fatigue", &["fatigue", "tiredness", "exhaustion"]),
    ("fever", &["fever", "high temperature"]),
    ("weakness", &["weakness", "general weakness"]),
    ("anxiety", &["anxiety", "anxiety and nervousness"]),
];

/// Clinical term → retrieval synonyms.
const QUERY_SYNONYMS: &[(&str, &[&str])] = &[
    ("dyspnea", &["shortness of breath", "breathlessness", "air hunger", "difficulty breathing"]),
    ("cough", &["productive cough", "dry cough", "coughing"]),
    ("wheezing", &["bronchospasm", "expiratory wheeze"]),
    ("hemoptysis", &["coughing blood", "bloody sputum"]),
    ("chest pain", &["chest discomfort", "chest pressure", "angina", "precordial pain"]),
    ("palpitations", &["heart racing", "irregular heartbeat", "arrhythmia"]),
    ("syncope", &["fainting", "loss of consciousness", "passing out"]),
    ("headache", &["cephalgia", "head pain", "migraine"]),
    ("dizziness", &["vertigo", "lightheadedness", "presyncope"]),
    ("weakness", &["paresis", "muscle weakness", "fatigue"]),
    ("nausea", &["feeling sick", "queasiness"]),
    ("vomiting", &["emesis", "throwing up"]),
    ("diarrhea", &["loose stools", "frequent bowel movements"]),
    ("abdominal pain", &["stomach pain", "belly pain", "abdominal discomfort"]),
    ("fever", &["pyrexia", "elevated temperature", "febrile"]),
    ("fatigue", &["tiredness", "exhaustion", "weakness"]),
    ("pain", &["ache", "discomfort", "soreness"]),
    ("pneumonia", &["lung infection", "pulmonary infection", "CAP"]),
    ("myocardial infarction", &["heart attack", "MI", "AMI", "acute coronary syndrome"]),
    ("pulmonary embolism", &["PE", "blood clot in lung", "thromboembolism"]),
    ("stroke", &["CVA", "cerebrovascular accident", "brain attack"]),
    ("heart failure", &["CHF", "congestive heart failure", "cardiac failure"]),
];

pub const DEFAULT_QUERY_EXPANSIONS: usize = 3;
const DIAGNOSIS_QUERY_EXPANSIONS: usize = 2;

/// Symptom-matrix variants for one symptom; unknown symptoms pass through.
pub fn expand_for_dataset(symptom: &str) -> Vec<String> {
    let key = symptom.trim().to_lowercase();
    match DATASET_SYNONYMS.iter().find(|(term, _)| *term == key) {
        Some((_, variants)) => variants.iter().map(|v| v.to_string()).collect(),
        None => vec![symptom.to_string()],
    }
}

/// Union of variants for many symptoms, first occurrence order.
pub fn expand_all_for_dataset(symptoms: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let expanded: Vec<String> = symptoms
        .iter()
        .flat_map(|s| expand_for_dataset(s))
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect();
    tracing::debug!(
        symptoms = symptoms.len(),
        variants = expanded.len(),
        "Expanded symptoms for dataset matching"
    );
    expanded
}

/// Append synonyms for every known clinical term found in `query`, joined
/// with " OR ". The original query always comes first.
pub fn expand_query(query: &str, max_expansions: usize) -> String {
    let lower = query.to_lowercase();
    let mut terms = vec![query.to_string()];
    for (term, synonyms) in QUERY_SYNONYMS {
        if lower.contains(term) {
            terms.extend(synonyms.iter().take(max_expansions).map(|s| s.to_string()));
        }
    }

    let mut seen = HashSet::new();
    terms.retain(|t| seen.insert(t.clone()));
    terms.join(" OR ")
}

/// Diagnosis-focused retrieval query: the expanded diagnosis followed by
/// the first three expanded symptoms.
pub fn expand_diagnosis_query(diagnosis: &str, symptoms: &[String]) -> String {
    let mut parts = vec![expand_query(diagnosis, DIAGNOSIS_QUERY_EXPANSIONS)];
    parts.extend(
        symptoms
            .iter()
            .take(3)
            .map(|s| expand_query(s, DIAGNOSIS_QUERY_EXPANSIONS)),
    );
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_expansion_known_and_unknown() {
        let chest = expand_for_dataset("Chest Pain");
        assert_eq!(chest.len(), 7);
        assert!(chest.contains(&"burning chest pain".to_string()));
        assert_eq!(expand_for_dataset("jaw pain"), vec!["jaw pain"]);
    }

    #[test]
    fn dataset_expansion_dedupes_across_symptoms() {
        let expanded = expand_all_for_dataset(&["sweating".into(), "diaphoresis".into()]);
        assert_eq!(expanded, vec!["sweating", "diaphoresis", "excessive sweating"]);
    }

    #[test]
    fn query_expansion_joins_with_or() {
        assert_eq!(
            expand_query("fever", DEFAULT_QUERY_EXPANSIONS),
            "fever OR pyrexia OR elevated temperature OR febrile"
        );
        assert_eq!(expand_query("rash", DEFAULT_QUERY_EXPANSIONS), "rash");
    }

    #[test]
    fn nested_terms_expand_independently() {
        // "chest pain" also contains "pain"
        let q = expand_query("chest pain", 1);
        assert_eq!(q, "chest pain OR chest discomfort OR ache");
    }

    #[test]
    fn diagnosis_query_limits_expansions() {
        let q = expand_diagnosis_query("Pulmonary embolism", &["cough".into()]);
        assert_eq!(
            q,
            "Pulmonary embolism OR PE OR blood clot in lung cough OR productive cough OR dry cough"
        );
    }
}
