use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "clinical-ddx";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Model identifier reported in every analysis response.
pub const MODEL_VERSION: &str = concat!("clinical-ddx-", env!("CARGO_PKG_VERSION"));

/// Which LLM backend the extraction and validation stages talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    Gemini,
    Ollama,
    /// Rules only; every LLM-assisted stage uses its fallback.
    None,
}

impl LlmBackend {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "ollama" => Self::Ollama,
            "none" | "off" | "rules" => Self::None,
            _ => Self::Gemini,
        }
    }
}

/// Runtime settings, read once from the environment at startup.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub llm_backend: LlmBackend,
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub ollama_embedding_model: String,
    pub llm_timeout_secs: u64,

    pub qdrant_url: Option<String>,
    #[serde(skip_serializing)]
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection: String,
    pub top_k_retrieval: usize,
    pub similarity_threshold: f64,
    pub embedding_dimension: usize,

    pub api_host: String,
    pub api_port: u16,
    pub cors_origins: Vec<String>,
    /// Key rate limits on `X-Forwarded-For` instead of the peer address.
    /// Only safe behind a reverse proxy that overwrites the header.
    pub trust_forwarded_for: bool,
    pub log_level: String,

    pub data_dir: PathBuf,
    pub symptom_matrix_path: Option<PathBuf>,
    pub ddxplus_conditions_path: Option<PathBuf>,
    pub ddxplus_evidences_path: Option<PathBuf>,
    pub knowledge_base_path: Option<PathBuf>,
    pub priors_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_backend: LlmBackend::Gemini,
            gemini_api_key: None,
            gemini_model: "models/gemini-flash-latest".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "medgemma:latest".to_string(),
            ollama_embedding_model: "nomic-embed-text".to_string(),
            llm_timeout_secs: 60,
            qdrant_url: None,
            qdrant_api_key: None,
            qdrant_collection: "open_patients_evidence".to_string(),
            top_k_retrieval: 25,
            similarity_threshold: 0.15,
            embedding_dimension: 768,
            api_host: "0.0.0.0".to_string(),
            api_port: 8000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
            trust_forwarded_for: false,
            log_level: "info".to_string(),
            data_dir: app_data_dir(),
            symptom_matrix_path: None,
            ddxplus_conditions_path: None,
            ddxplus_evidences_path: None,
            knowledge_base_path: None,
            priors_path: None,
        }
    }
}

impl Settings {
    /// Read settings from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unset or unparsable
    /// values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut s = Self::default();

        if let Some(v) = get("LLM_BACKEND") {
            s.llm_backend = LlmBackend::parse(&v);
        }
        s.gemini_api_key = get("GEMINI_API_KEY");
        if let Some(v) = get("GEMINI_MODEL") {
            s.gemini_model = v;
        }
        if let Some(v) = get("GEMINI_BASE_URL") {
            s.gemini_base_url = v;
        }
        if let Some(v) = get("OLLAMA_URL") {
            s.ollama_url = v;
        }
        if let Some(v) = get("OLLAMA_MODEL") {
            s.ollama_model = v;
        }
        if let Some(v) = get("OLLAMA_EMBEDDING_MODEL") {
            s.ollama_embedding_model = v;
        }
        parse_into(&get, "LLM_TIMEOUT_SECS", &mut s.llm_timeout_secs);

        s.qdrant_url = get("QDRANT_URL");
        s.qdrant_api_key = get("QDRANT_API_KEY");
        if let Some(v) = get("QDRANT_COLLECTION") {
            s.qdrant_collection = v;
        }
        parse_into(&get, "TOP_K_RETRIEVAL", &mut s.top_k_retrieval);
        parse_into(&get, "SIMILARITY_THRESHOLD", &mut s.similarity_threshold);
        parse_into(&get, "EMBEDDING_DIMENSION", &mut s.embedding_dimension);

        if let Some(v) = get("API_HOST") {
            s.api_host = v;
        }
        parse_into(&get, "API_PORT", &mut s.api_port);
        if let Some(v) = get("CORS_ORIGINS") {
            s.cors_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(v) = get("TRUST_FORWARDED_FOR") {
            s.trust_forwarded_for = matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = get("LOG_LEVEL") {
            s.log_level = v.to_lowercase();
        }

        if let Some(v) = get("DATA_DIR") {
            s.data_dir = PathBuf::from(v);
        }
        s.symptom_matrix_path = get("SYMPTOM_MATRIX_PATH").map(PathBuf::from);
        s.ddxplus_conditions_path = get("DDXPLUS_CONDITIONS_PATH").map(PathBuf::from);
        s.ddxplus_evidences_path = get("DDXPLUS_EVIDENCES_PATH").map(PathBuf::from);
        s.knowledge_base_path = get("KNOWLEDGE_BASE_PATH").map(PathBuf::from);
        s.priors_path = get("CLINICAL_PRIORS_PATH").map(PathBuf::from);

        s
    }

    /// Socket address the HTTP API binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.api_host, self.api_port).parse()
    }

    /// SQLite audit database location.
    pub fn audit_db_path(&self) -> PathBuf {
        self.data_dir.join("audit.db")
    }
}

fn parse_into<T, G>(get: &G, key: &str, slot: &mut T)
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(key) {
        match raw.trim().parse() {
            Ok(v) => *slot = v,
            Err(_) => tracing::warn!(key, value = %raw, "Ignoring unparsable setting"),
        }
    }
}

/// Default data directory: `~/.clinical-ddx`, or `./.clinical-ddx` when no
/// home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".clinical-ddx")
}

/// Tracing filter used when `RUST_LOG` is not set.
pub fn default_log_filter(level: &str) -> String {
    format!("clinical_ddx={level},tower_http=info,warn")
}
