use std::collections::HashMap;

use serde::Deserialize;

use super::KnowledgeError;

const FALLBACK_DEFAULT: f64 = 4.0;

/// "Danger if missed" priors on a 0-10 scale, keyed by lowercase diagnosis.
#[derive(Debug, Clone)]
pub struct DangerPriors {
    scores: HashMap<String, f64>,
    default: f64,
}

#[derive(Deserialize)]
struct RawPriors {
    #[serde(default)]
    danger_priors: HashMap<String, serde_json::Value>,
}

impl DangerPriors {
    pub fn parse(json: &str) -> Result<Self, KnowledgeError> {
        let raw: RawPriors = serde_json::from_str(json).map_err(|source| KnowledgeError::Json {
            dataset: "clinical priors",
            source,
        })?;

        let mut default = FALLBACK_DEFAULT;
        let mut scores = HashMap::new();
        for (key, value) in raw.danger_priors {
            let Some(score) = value.as_f64() else {
                continue;
            };
            if key == "_default" {
                default = score;
            } else if !key.starts_with('_') {
                scores.insert(key.to_lowercase(), score);
            }
        }

        Ok(Self { scores, default })
    }

    pub fn default_score(&self) -> f64 {
        self.default
    }

    /// Exact match, then the longest known name that contains or is
    /// contained in the diagnosis, then the default.
    pub fn danger_score(&self, diagnosis: &str) -> f64 {
        let dx = diagnosis.trim().to_lowercase();
        if let Some(score) = self.scores.get(&dx) {
            return *score;
        }
        self.scores
            .iter()
            .filter(|(known, _)| dx.contains(known.as_str()) || known.contains(dx.as_str()))
            .max_by_key(|(known, _)| known.len())
            .map(|(_, score)| *score)
            .unwrap_or(self.default)
    }
}

impl Default for DangerPriors {
    fn default() -> Self {
        Self {
            scores: HashMap::new(),
            default: FALLBACK_DEFAULT,
        }
    }
}
