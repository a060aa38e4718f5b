//! Deterministic candidate generation against the bundled datasets.
//!
//! Both matchers emit [`CandidateDiagnosis`] values with `match_score`
//! in 0.0-1.0 so [`combine`] can compare them directly.
//!
//! [`CandidateDiagnosis`]: crate::models::CandidateDiagnosis

pub mod combine;
pub mod ddxplus;
pub mod symptom_matrix;

pub use combine::{combine_candidates, dedupe_by_name};
pub use ddxplus::{match_ddxplus, DDXPLUS_DATASET};
pub use symptom_matrix::{match_symptom_matrix, SYMPTOM_MATRIX_DATASET};

/// Candidates kept per matcher before validation.
pub const MATCHER_TOP_K: usize = 10;
