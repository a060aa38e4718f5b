//! Clinical note analysis: turns free-text notes into ranked, explainable
//! differential diagnoses with evidence, risk and red-flag screening.

pub mod api;
pub mod cli;
pub mod clinical;
pub mod config;
pub mod db;
pub mod knowledge;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod retrieval;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over `level`.
/// Output goes to stderr so CLI JSON on stdout stays clean.
pub fn init_tracing(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter(level))),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
