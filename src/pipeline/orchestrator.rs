use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use super::extraction::extract_findings;
use super::matching::{combine_candidates, match_ddxplus, match_symptom_matrix, MATCHER_TOP_K};
use super::normalize::{canonical_symptoms, detect_patterns};
use super::review::{generate_candidates, review_candidates};
use super::scoring::{
    classify_plausibility, evidence_support, rank_diagnoses, reasoning_consistency, score_confidence,
    RuleScorer,
};
use super::summary::build_summary;
use super::validation::validate_note;
use super::PipelineError;
use crate::clinical::{
    apply_severities, classify_safety, detect_red_flags, filter_candidates, initial_management,
    missing_information, recommended_tests, RiskCalculator,
};
use crate::config::{Settings, MODEL_VERSION};
use crate::knowledge::KnowledgeBundle;
use crate::llm::{client_from_settings, LlmHandle};
use crate::models::{
    AnalysisResponse, CandidateDiagnosis, ClinicalNoteRequest, ConfidenceScore, DifferentialDiagnosis,
    EvidenceCitation, ExtractedFindings, ProcessingStatus, RiskAssessment,
};
use crate::retrieval::{CitationAllocator, EvidenceRetriever, RetrievedEvidence};

/// Diagnoses reported per analysis.
pub const MAX_DIFFERENTIALS: usize = 5;

/// `req_` followed by 12 hex characters.
pub fn new_request_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("req_{}", &hex[..12])
}

/// End-to-end analysis of one clinical note.
///
/// Every LLM-assisted stage has a deterministic fallback, and retrieval is
/// optional, so the only hard failure is a note that does not validate.
pub struct ClinicalPipeline {
    knowledge: KnowledgeBundle,
    llm: Option<LlmHandle>,
    retriever: Option<EvidenceRetriever>,
}

/// A candidate with everything computed for it before ranking.
struct ScoredCandidate {
    candidate: CandidateDiagnosis,
    citations: Vec<EvidenceCitation>,
    confidence: ConfidenceScore,
    risk: RiskAssessment,
    reasoning: String,
}

impl ClinicalPipeline {
    /// Rules-only pipeline over the given datasets.
    pub fn new(knowledge: KnowledgeBundle) -> Self {
        Self {
            knowledge,
            llm: None,
            retriever: None,
        }
    }

    pub fn with_llm(mut self, llm: LlmHandle) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_retriever(mut self, retriever: EvidenceRetriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Load datasets and connect the configured backends.
    pub fn from_settings(settings: &Settings) -> Result<Self, PipelineError> {
        let knowledge = KnowledgeBundle::load(settings)?;
        let llm = client_from_settings(settings)?;
        let retriever = EvidenceRetriever::from_settings(settings, &knowledge.clinical_kb)?;

        tracing::info!(
            llm = llm.as_ref().map(|l| l.model()).unwrap_or("none"),
            retrieval = retriever.is_some(),
            "Clinical pipeline ready"
        );

        Ok(Self {
            knowledge,
            llm,
            retriever,
        })
    }

    pub fn knowledge(&self) -> &KnowledgeBundle {
        &self.knowledge
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    pub fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    pub fn analyze(&self, request: &ClinicalNoteRequest) -> Result<AnalysisResponse, PipelineError> {
        self.analyze_with_id(&new_request_id(), request)
    }

    pub fn analyze_with_id(
        &self,
        request_id: &str,
        request: &ClinicalNoteRequest,
    ) -> Result<AnalysisResponse, PipelineError> {
        let _span = tracing::info_span!("analyze", request_id, input_type = ?request.input_type).entered();
        let started = Instant::now();
        let note = request.clinical_note.as_str();
        let llm = self.llm.as_ref();

        // Step 1: Reject empty, gibberish or non-clinical input
        let report = validate_note(note)?;
        tracing::info!(length = report.length, medical_score = report.medical_score, "Input validated");

        // Step 2: Structured findings, with severities filled in
        let mut findings = extract_findings(note, llm);
        apply_severities(&mut findings, note);
        let symptoms = findings.symptom_names();

        // Step 3: Canonical symptoms and pattern scores, computed once
        let canonical = canonical_symptoms(&findings);
        let patterns = detect_patterns(&findings);
        tracing::info!(
            canonical = canonical.len(),
            gi = patterns.gi,
            cardiac = patterns.cardiac,
            "Symptoms normalized"
        );

        // Step 4: Dataset matching, combination and hard exclusions
        let matrix = match_symptom_matrix(
            &self.knowledge.symptom_matrix,
            &findings,
            &canonical,
            patterns,
            MATCHER_TOP_K,
        );
        let structured = match_ddxplus(&self.knowledge.ddxplus, &findings, MATCHER_TOP_K);
        let combined = combine_candidates(structured, matrix);
        let filtered = filter_candidates(combined, &findings);
        tracing::info!(candidates = filtered.len(), "Dataset candidates ready");

        // Step 5: LLM review; generate hypotheses when nothing survives
        let mut candidates = review_candidates(llm, filtered, &symptoms, &findings.demographics);
        if candidates.is_empty() {
            candidates = filter_candidates(generate_candidates(llm, note, &findings, &symptoms), &findings);
        }

        // Step 6: Evidence retrieval
        let evidence = self.retrieve_evidence(&symptoms, note);

        // Step 7: Per-candidate citations, confidence, plausibility and risk
        let features = rule_features(&canonical, &findings);
        let scorer = RuleScorer::new(&self.knowledge.clinical_kb);
        let risk_calculator = RiskCalculator::new(&self.knowledge.priors);
        let mut allocator = CitationAllocator::new();

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|candidate| {
                let citations = allocator.allocate(&evidence.passages);
                let rule = scorer.score(&candidate.name, &features, &findings);
                let mut reasoning = format!(
                    "{}\n\nClinical Plausibility: {}. {}",
                    base_reasoning(&candidate),
                    rule.category.headline(),
                    rule.reasoning
                );
                let why_not = scorer.negative_reasoning(&candidate.name, &features);
                if !why_not.is_empty() {
                    reasoning.push_str(&format!("\n{why_not}."));
                }

                let consistency = reasoning_consistency(&candidate.name, &reasoning, &citations, &symptoms);
                let confidence = score_confidence(&candidate, &citations, &findings, consistency.score);
                let risk = risk_calculator.assess(&candidate.name, &findings, confidence.point_estimate);

                ScoredCandidate {
                    candidate,
                    citations,
                    confidence,
                    risk,
                    reasoning,
                }
            })
            .collect();

        // Step 8: Rank and keep the top differentials
        rank_diagnoses(&mut scored, |s| (&s.candidate, s.citations.len()));
        scored.truncate(MAX_DIFFERENTIALS);

        let mut diagnoses: Vec<DifferentialDiagnosis> = Vec::with_capacity(scored.len());
        for (i, s) in scored.into_iter().enumerate() {
            let previous = diagnoses.last().map(|d| d.diagnosis.as_str());
            let comparative = comparative_reasoning(i + 1, previous);
            diagnoses.push(to_differential(i + 1, s, comparative, &symptoms, &findings));
        }

        // Step 9: Red flags and summary
        let red_flags = detect_red_flags(llm, note, &diagnoses, &symptoms, &findings.vital_signs);
        let summary = build_summary(llm, note, &findings, missing_information(&findings));

        let processing_time_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            diagnoses = diagnoses.len(),
            red_flags = red_flags.len(),
            processing_time_ms,
            "Analysis complete"
        );

        Ok(AnalysisResponse {
            request_id: request_id.to_string(),
            status: ProcessingStatus::Completed,
            summary,
            differential_diagnoses: diagnoses,
            red_flags,
            evidence_quality: evidence.explanation,
            processing_time_ms,
            model_version: MODEL_VERSION.to_string(),
            generated_at: Utc::now(),
        })
    }

    fn retrieve_evidence(&self, symptoms: &[String], note: &str) -> RetrievedEvidence {
        let Some(retriever) = &self.retriever else {
            return RetrievedEvidence {
                explanation: "Evidence retrieval not configured".to_string(),
                ..Default::default()
            };
        };
        match retriever.retrieve(symptoms, note) {
            Ok(evidence) => evidence,
            Err(e) => {
                tracing::warn!(error = %e, "Evidence retrieval failed, continuing without citations");
                RetrievedEvidence {
                    explanation: "Evidence retrieval unavailable".to_string(),
                    ..Default::default()
                }
            }
        }
    }
}

/// Patient justification cites at most this many symptoms.
const MAX_JUSTIFYING_SYMPTOMS: usize = 5;

fn to_differential(
    rank: usize,
    scored: ScoredCandidate,
    comparative_reasoning: String,
    symptoms: &[String],
    findings: &ExtractedFindings,
) -> DifferentialDiagnosis {
    let ScoredCandidate {
        candidate,
        citations,
        confidence,
        risk,
        reasoning,
    } = scored;
    let safety = classify_safety(&candidate.name, &findings.clinical_red_flags);
    let patient_justification = justifying_symptoms(&reasoning, symptoms);

    DifferentialDiagnosis {
        rank,
        plausibility: classify_plausibility(&candidate, citations.len()).to_string(),
        evidence_support: evidence_support(citations.len()).to_string(),
        recommended_tests: recommended_tests(&candidate.name),
        initial_management: initial_management(&candidate.name, risk.level),
        diagnosis: candidate.name,
        confidence,
        risk_level: risk.level,
        risk_label: risk.label,
        risk_score: risk.score,
        risk_method: risk.method,
        matched_symptoms: candidate.matched_symptoms,
        reasoning,
        patient_justification,
        comparative_reasoning,
        supporting_evidence: citations,
        provenance: candidate.provenance,
        safety_category: safety.category,
    }
}

fn comparative_reasoning(rank: usize, previous: Option<&str>) -> String {
    match previous {
        None => format!("Ranked #{rank} due to strongest symptom match and highest evidence support."),
        Some(previous) => format!(
            "Ranked #{rank} - less likely than {previous} due to weaker pattern match or atypical features."
        ),
    }
}

/// Patient symptoms mentioned in the reasoning, in extraction order.
fn justifying_symptoms(reasoning: &str, symptoms: &[String]) -> Vec<String> {
    let reasoning = reasoning.to_lowercase();
    symptoms
        .iter()
        .filter(|s| !s.trim().is_empty() && reasoning.contains(&s.to_lowercase()))
        .take(MAX_JUSTIFYING_SYMPTOMS)
        .cloned()
        .collect()
}

/// Rule-scorer input: canonical symptom forms plus risk factors.
fn rule_features(canonical: &[String], findings: &ExtractedFindings) -> Vec<String> {
    canonical
        .iter()
        .chain(findings.risk_factors.iter())
        .cloned()
        .collect()
}

fn base_reasoning(candidate: &CandidateDiagnosis) -> String {
    if let Some(reasoning) = &candidate.llm_reasoning {
        return reasoning.clone();
    }
    let dataset = candidate.provenance.dataset.as_deref().unwrap_or("reference data");
    if candidate.matched_symptoms.is_empty() {
        return format!("Suggested by {dataset}.");
    }
    format!(
        "Matched {}/{} patient symptoms in {dataset}: {}.",
        candidate.match_count(),
        candidate.total_symptoms.max(candidate.match_count()),
        candidate.matched_symptoms.join(", ")
    )
}
