//! Text-generation backends used by extraction, candidate review and
//! summarization. Every caller has a deterministic fallback, so a missing
//! or failing backend degrades output rather than failing a request.

pub mod gemini;
pub mod ollama;
pub mod types;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use types::{LlmClient, LlmHandle, MockLlmClient};

use thiserror::Error;

use crate::config::{LlmBackend, Settings};

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM backend is not reachable at {0}")]
    Connection(String),

    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    #[error("LLM backend returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("LLM returned an empty response")]
    EmptyResponse,

    #[error("LLM backend not configured: {0}")]
    NotConfigured(String),
}

/// Map a reqwest failure the same way for every backend.
pub(crate) fn map_send_error(err: reqwest::Error, base_url: &str, timeout_secs: u64) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(timeout_secs)
    } else if err.is_connect() {
        LlmError::Connection(base_url.to_string())
    } else {
        LlmError::HttpClient(err.to_string())
    }
}

/// Build the configured backend. `None` when LLM use is switched off or the
/// backend lacks credentials; callers then run rules only.
pub fn client_from_settings(settings: &Settings) -> Result<Option<LlmHandle>, LlmError> {
    match settings.llm_backend {
        LlmBackend::None => Ok(None),
        LlmBackend::Gemini => match settings.gemini_api_key.as_deref() {
            Some(key) => {
                let client = GeminiClient::new(
                    &settings.gemini_base_url,
                    key,
                    settings.llm_timeout_secs,
                )?;
                Ok(Some(LlmHandle::new(client, &settings.gemini_model)))
            }
            None => {
                tracing::warn!("GEMINI_API_KEY not set; LLM-assisted stages will use rule fallbacks");
                Ok(None)
            }
        },
        LlmBackend::Ollama => {
            let client = OllamaClient::new(&settings.ollama_url, settings.llm_timeout_secs)?;
            Ok(Some(LlmHandle::new(client, &settings.ollama_model)))
        }
    }
}
