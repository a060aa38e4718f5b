use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::diagnosis::{Provenance, RiskLevel, RiskMethod};
use crate::clinical::SafetyCategory;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Point estimate with an uncertainty interval, all within 0.0-1.0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceScore {
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub uncertainty_sources: Vec<String>,
    /// How well the reasoning is grounded in patient data and citations.
    pub reasoning_consistency: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlagSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedFlag {
    pub flag: String,
    pub severity: FlagSeverity,
    pub keywords: Vec<String>,
}

/// A retrieved passage cited in support of a diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceCitation {
    pub case_id: String,
    pub source: String,
    pub excerpt: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DifferentialDiagnosis {
    pub rank: usize,
    pub diagnosis: String,
    pub confidence: ConfidenceScore,
    pub risk_level: RiskLevel,
    pub risk_label: String,
    pub risk_score: f64,
    pub risk_method: RiskMethod,
    pub plausibility: String,
    pub evidence_support: String,
    pub matched_symptoms: Vec<String>,
    pub reasoning: String,
    /// Patient symptoms the reasoning actually cites.
    pub patient_justification: Vec<String>,
    /// Why this diagnosis sits below the one ranked above it.
    pub comparative_reasoning: String,
    pub supporting_evidence: Vec<EvidenceCitation>,
    pub recommended_tests: Vec<String>,
    pub initial_management: Vec<String>,
    pub provenance: Provenance,
    pub safety_category: SafetyCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicalSummary {
    pub summary: String,
    pub chief_complaint: String,
    pub timeline: String,
    pub key_findings: Vec<String>,
    pub missing_information: Vec<String>,
    pub uncertainty_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResponse {
    pub request_id: String,
    pub status: ProcessingStatus,
    pub summary: ClinicalSummary,
    pub differential_diagnoses: Vec<DifferentialDiagnosis>,
    pub red_flags: Vec<RedFlag>,
    pub evidence_quality: String,
    pub processing_time_ms: u64,
    pub model_version: String,
    pub generated_at: DateTime<Utc>,
}
