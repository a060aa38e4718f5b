pub mod confidence;
pub mod consistency;
pub mod ranking;
pub mod rule_scorer;

pub use confidence::{base_confidence, score_confidence};
pub use consistency::{reasoning_consistency, ConsistencyCheck};
pub use ranking::{classify_plausibility, evidence_support, rank_diagnoses, rule_score, uncertainty_level};
pub use rule_scorer::{LikelihoodCategory, RuleScore, RuleScorer};
