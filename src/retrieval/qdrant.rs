use serde::{Deserialize, Serialize};

use super::store::VectorSearch;
use super::types::EvidencePassage;
use super::{map_send_error, RetrievalError};

/// Source label used when a point carries none.
const DEFAULT_SOURCE: &str = "open-patients";

/// Qdrant REST client for the similar-case collection.
pub struct QdrantClient {
    base_url: String,
    api_key: Option<String>,
    collection: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    score_threshold: f32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: serde_json::Value,
    score: f32,
    #[serde(default)]
    payload: Option<PointPayload>,
}

#[derive(Deserialize, Default)]
struct PointPayload {
    #[serde(default)]
    text: String,
    #[serde(default)]
    case_id: Option<serde_json::Value>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    section_type: Option<String>,
}

impl QdrantClient {
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        collection: &str,
        timeout_secs: u64,
    ) -> Result<Self, RetrievalError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RetrievalError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
            collection: collection.to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn search_url(&self) -> String {
        format!("{}/collections/{}/points/search", self.base_url, self.collection)
    }
}

impl VectorSearch for QdrantClient {
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<EvidencePassage>, RetrievalError> {
        let mut request = self.client.post(self.search_url()).json(&SearchRequest {
            vector: query_embedding,
            limit: top_k,
            with_payload: true,
            score_threshold: threshold,
        });
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = request
            .send()
            .map_err(|e| map_send_error(e, &self.base_url, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RetrievalError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .map_err(|e| RetrievalError::ResponseParsing(e.to_string()))?;
        let passages = parse_search_response(&body)?;
        tracing::debug!(
            collection = %self.collection,
            hits = passages.len(),
            "Qdrant search complete"
        );
        Ok(passages)
    }
}

/// Convert a `points/search` body into passages. Points without text are
/// dropped; a missing `case_id` falls back to the point id.
fn parse_search_response(body: &str) -> Result<Vec<EvidencePassage>, RetrievalError> {
    let parsed: SearchResponse =
        serde_json::from_str(body).map_err(|e| RetrievalError::ResponseParsing(e.to_string()))?;

    Ok(parsed
        .result
        .into_iter()
        .filter_map(|point| {
            let payload = point.payload.unwrap_or_default();
            if payload.text.trim().is_empty() {
                return None;
            }
            let case_id = payload
                .case_id
                .as_ref()
                .map(json_id)
                .unwrap_or_else(|| json_id(&point.id));
            let mut passage = EvidencePassage::new(
                &case_id,
                payload.source.as_deref().unwrap_or(DEFAULT_SOURCE),
                &payload.text,
            )
            .with_similarity(point.score);
            passage.section_type = payload.section_type;
            Some(passage)
        })
        .collect())
}

/// Qdrant ids are integers or UUID strings.
fn json_id(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
