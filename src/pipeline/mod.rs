//! Clinical-note analysis: validation, extraction, matching, scoring and
//! assembly of the response.

pub mod expansion;
pub mod extraction;
pub mod matching;
pub mod normalize;
pub mod orchestrator;
pub mod review;
pub mod scoring;
pub mod summary;
pub mod validation;

pub use orchestrator::{new_request_id, ClinicalPipeline, MAX_DIFFERENTIALS};
pub use validation::{validate_note, ValidationError, ValidationErrorKind};

use thiserror::Error;

use crate::knowledge::KnowledgeError;
use crate::llm::LlmError;
use crate::retrieval::RetrievalError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Knowledge base error: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("LLM setup error: {0}")]
    Llm(#[from] LlmError),

    #[error("Retrieval setup error: {0}")]
    Retrieval(#[from] RetrievalError),
}
