use serde::{Deserialize, Serialize};

/// Where a candidate diagnosis came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisSource {
    /// Deterministic dataset matching or rule scoring.
    Rule,
    /// Retrieved evidence (similar cases, literature).
    Evidence,
    /// LLM-generated; lowest trust.
    Llm,
}

impl DiagnosisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Evidence => "evidence",
            Self::Llm => "llm",
        }
    }
}

/// Provenance attached to every candidate so the output is explainable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provenance {
    pub source: DiagnosisSource,
    pub rule_applied: bool,
    pub llm_used: bool,
    /// Dataset name for rule-sourced candidates.
    pub dataset: Option<String>,
}

impl Provenance {
    pub fn dataset(name: &str) -> Self {
        Self {
            source: DiagnosisSource::Rule,
            rule_applied: true,
            llm_used: false,
            dataset: Some(name.to_string()),
        }
    }

    /// Generic placeholder produced when neither datasets nor the LLM
    /// yield a candidate.
    pub fn fallback() -> Self {
        Self {
            source: DiagnosisSource::Rule,
            rule_applied: true,
            llm_used: false,
            dataset: None,
        }
    }

    pub fn llm() -> Self {
        Self {
            source: DiagnosisSource::Llm,
            rule_applied: false,
            llm_used: true,
            dataset: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceStrength {
    Weak,
    Moderate,
    Strong,
}

impl EvidenceStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }
}

/// How a candidate's base confidence is derived.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceType {
    CaseBased,
    /// Symptom-matrix column overlap.
    SymptomMatch,
    /// Structured evidence overlap (DDXPlus conditions).
    StructuredMatch,
    LlmGenerated,
    RuleBasedFallback,
}

impl EvidenceType {
    /// Both dataset matchers derive confidence from their match score.
    pub fn is_symptom_match(&self) -> bool {
        matches!(self, Self::SymptomMatch | Self::StructuredMatch)
    }
}

/// A diagnosis candidate flowing through matching, filtering and scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateDiagnosis {
    pub name: String,
    /// 0.0-1.0.
    pub match_score: f64,
    pub matched_symptoms: Vec<String>,
    pub total_symptoms: usize,
    pub evidence_strength: EvidenceStrength,
    pub evidence_type: EvidenceType,
    pub provenance: Provenance,
    /// Dataset-provided severity, when known.
    pub severity: Option<u8>,
    /// Reasoning supplied by a validating or generating LLM.
    pub llm_reasoning: Option<String>,
}

impl CandidateDiagnosis {
    pub fn match_count(&self) -> usize {
        self.matched_symptoms.len()
    }
}

/// Output risk band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Blue,
    Orange,
    Red,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Red => "Danger",
            Self::Orange => "Warning",
            Self::Blue => "Low",
        }
    }

    /// Band for a 0-10 risk score: >= 7 red, >= 4 orange.
    pub fn from_score(score: f64) -> Self {
        if score >= 7.0 {
            Self::Red
        } else if score >= 4.0 {
            Self::Orange
        } else {
            Self::Blue
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskMethod {
    HeartScore,
    WellsPe,
    DangerWeighted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub label: String,
    pub score: f64,
    pub method: RiskMethod,
    pub components: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_bands_follow_thresholds() {
        assert_eq!(RiskLevel::from_score(7.0), RiskLevel::Red);
        assert_eq!(RiskLevel::from_score(6.9), RiskLevel::Orange);
        assert_eq!(RiskLevel::from_score(4.0), RiskLevel::Orange);
        assert_eq!(RiskLevel::from_score(3.99), RiskLevel::Blue);
        assert_eq!(RiskLevel::Red.label(), "Danger");
    }

    #[test]
    fn provenance_serializes_snake_case() {
        let json = serde_json::to_value(Provenance::dataset("ddxplus")).unwrap();
        assert_eq!(json["source"], "rule");
        assert_eq!(json["rule_applied"], true);
        assert_eq!(json["dataset"], "ddxplus");
    }

    #[test]
    fn evidence_type_is_kebab_case() {
        let json = serde_json::to_value(EvidenceType::RuleBasedFallback).unwrap();
        assert_eq!(json, "rule-based-fallback");
    }
}
