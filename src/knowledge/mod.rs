//! Reference datasets the deterministic scoring stages run against.
//!
//! Every dataset ships embedded in the binary and can be replaced at
//! startup by pointing the matching setting at a file on disk.

pub mod clinical_kb;
pub mod ddxplus;
pub mod priors;
pub mod symptom_matrix;

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use clinical_kb::{ClinicalKnowledgeBase, LikelihoodThresholds, NegativeFeatures};
pub use ddxplus::{DdxCondition, DdxEvidence, DdxPlus};
pub use priors::DangerPriors;
pub use symptom_matrix::{DiseasePattern, SymptomMatrix};

use crate::config::Settings;

const BUNDLED_SYMPTOM_MATRIX: &str =
    include_str!("../../resources/knowledge/disease_symptoms.csv");
const BUNDLED_DDX_CONDITIONS: &str =
    include_str!("../../resources/knowledge/ddxplus_conditions.json");
const BUNDLED_DDX_EVIDENCES: &str =
    include_str!("../../resources/knowledge/ddxplus_evidences.json");
const BUNDLED_KNOWLEDGE_BASE: &str =
    include_str!("../../resources/knowledge/clinical_knowledge_base.json");
const BUNDLED_PRIORS: &str = include_str!("../../resources/knowledge/clinical_priors.json");

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Cannot read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV at line {line}: {reason}")]
    Csv { line: usize, reason: String },

    #[error("Malformed JSON dataset {dataset}: {source}")]
    Json {
        dataset: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dataset {0} is empty")]
    Empty(&'static str),
}

/// All reference data, loaded once and shared read-only by the pipeline.
#[derive(Debug, Clone)]
pub struct KnowledgeBundle {
    pub symptom_matrix: SymptomMatrix,
    pub ddxplus: DdxPlus,
    pub clinical_kb: ClinicalKnowledgeBase,
    pub priors: DangerPriors,
}

impl KnowledgeBundle {
    /// Load the datasets compiled into the binary.
    pub fn bundled() -> Result<Self, KnowledgeError> {
        Self::from_sources(
            BUNDLED_SYMPTOM_MATRIX,
            BUNDLED_DDX_CONDITIONS,
            BUNDLED_DDX_EVIDENCES,
            BUNDLED_KNOWLEDGE_BASE,
            BUNDLED_PRIORS,
        )
    }

    /// Load datasets, preferring configured paths over the bundled copies.
    pub fn load(settings: &Settings) -> Result<Self, KnowledgeError> {
        let matrix = read_or_bundled(settings.symptom_matrix_path.as_deref(), BUNDLED_SYMPTOM_MATRIX)?;
        let conditions =
            read_or_bundled(settings.ddxplus_conditions_path.as_deref(), BUNDLED_DDX_CONDITIONS)?;
        let evidences =
            read_or_bundled(settings.ddxplus_evidences_path.as_deref(), BUNDLED_DDX_EVIDENCES)?;
        let kb = read_or_bundled(settings.knowledge_base_path.as_deref(), BUNDLED_KNOWLEDGE_BASE)?;
        let priors = read_or_bundled(settings.priors_path.as_deref(), BUNDLED_PRIORS)?;

        Self::from_sources(&matrix, &conditions, &evidences, &kb, &priors)
    }

    fn from_sources(
        matrix: &str,
        conditions: &str,
        evidences: &str,
        kb: &str,
        priors: &str,
    ) -> Result<Self, KnowledgeError> {
        let bundle = Self {
            symptom_matrix: SymptomMatrix::parse(matrix)?,
            ddxplus: DdxPlus::parse(conditions, evidences)?,
            clinical_kb: ClinicalKnowledgeBase::parse(kb)?,
            priors: DangerPriors::parse(priors)?,
        };

        tracing::info!(
            csv_patterns = bundle.symptom_matrix.patterns().len(),
            csv_columns = bundle.symptom_matrix.columns().len(),
            ddx_conditions = bundle.ddxplus.conditions().len(),
            ddx_evidences = bundle.ddxplus.evidence_count(),
            kb_diseases = bundle.clinical_kb.disease_count(),
            "Knowledge datasets loaded"
        );

        Ok(bundle)
    }
}

fn read_or_bundled(
    path: Option<&Path>,
    bundled: &'static str,
) -> Result<Cow<'static, str>, KnowledgeError> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .map(Cow::Owned)
            .map_err(|source| KnowledgeError::Io {
                path: path.to_path_buf(),
                source,
            }),
        None => Ok(Cow::Borrowed(bundled)),
    }
}
