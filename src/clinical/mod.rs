//! Deterministic clinical rules applied to ranked candidates: symptom
//! severity, risk stratification, red flags, workup recommendations and
//! exclusion of impossible diagnoses.

pub mod exclusion;
pub mod recommendations;
pub mod red_flags;
pub mod risk;
pub mod severity;

pub use exclusion::{filter_candidates, should_exclude};
pub use recommendations::{initial_management, missing_information, recommended_tests};
pub use red_flags::{detect_red_flags, fallback_red_flags, parse_red_flags, MAX_RED_FLAGS};
pub use risk::{classify_safety, RiskCalculator, SafetyCategory, SafetyClassification};
pub use severity::{apply_severities, calculate_severity};

/// Whole-word containment. `word` may span several words ("chest pain").
pub(crate) fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let end = start + word.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_boundaries() {
        assert!(contains_word("SUSPECTED PE", "PE"));
        assert!(contains_word("ACS/NSTEMI", "ACS"));
        assert!(!contains_word("PEPTIC ULCER", "PE"));
        assert!(!contains_word("known", "no"));
        assert!(contains_word("pain, no radiation", "no"));
        assert!(contains_word("crushing chest pain", "chest pain"));
    }
}
