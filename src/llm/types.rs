use std::sync::{Arc, Mutex};

use super::LlmError;

/// Blocking text-generation backend.
pub trait LlmClient: Send + Sync {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, LlmError>;
    fn is_model_available(&self, model: &str) -> Result<bool, LlmError>;
    fn list_models(&self) -> Result<Vec<String>, LlmError>;
}

/// A backend bound to the model it should be asked to run.
#[derive(Clone)]
pub struct LlmHandle {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl LlmHandle {
    pub fn new<C: LlmClient + 'static>(client: C, model: &str) -> Self {
        Self {
            client: Arc::new(client),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate with the bound model. Blank output counts as a failure.
    pub fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let text = self.client.generate(&self.model, prompt, system)?;
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    pub fn is_available(&self) -> Result<bool, LlmError> {
        self.client.is_model_available(&self.model)
    }
}

impl std::fmt::Debug for LlmHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmHandle").field("model", &self.model).finish()
    }
}

/// Mock LLM client for testing. Replies are served in order; the last one
/// repeats once the queue is exhausted.
pub struct MockLlmClient {
    responses: Mutex<Vec<Result<String, String>>>,
    available_models: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self::sequence(vec![Ok(response.to_string())])
    }

    /// A client whose every call fails with a connection error.
    pub fn failing() -> Self {
        Self::sequence(vec![Err("mock backend down".to_string())])
    }

    pub fn sequence(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            available_models: vec!["mock-model".to_string()],
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _model: &str, prompt: &str, _system: &str) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| LlmError::HttpClient("mock lock poisoned".into()))?;
        let next = if responses.len() > 1 {
            responses.remove(0)
        } else {
            responses
                .first()
                .cloned()
                .unwrap_or_else(|| Ok(String::new()))
        };
        next.map_err(LlmError::Connection)
    }

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError> {
        Ok(self.available_models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(self.available_models.clone())
    }
}
