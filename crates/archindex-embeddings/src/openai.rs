//! OpenAI-compatible embedding provider.
//!
//! Works with OpenAI, Azure OpenAI, Together.ai, and any OpenAI-compatible API.
//! Default model: text-embedding-3-small.

use archindex_core::IndexerError;
use serde_json::Value;

/// Default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// OpenAI embedding provider.
pub struct OpenAIProvider {
    api_key: String,
    model: String,
    dimensions: usize,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    pub fn new(api_key: &str, model: &str, dimensions: usize, base_url: Option<&str>) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimensions,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Create with default model (text-embedding-3-small, 1024 dims).
    pub fn with_api_key(api_key: &str) -> Self {
        Self::new(api_key, DEFAULT_MODEL, super::DIMENSIONS, None)
    }

    fn request(&self, input: Value) -> Result<Vec<Vec<f32>>, IndexerError> {
        let url = format!("{}/embeddings", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "input": input,
        });

        // text-embedding-3-* supports custom dimensions
        if self.model.starts_with("text-embedding-3") {
            body["dimensions"] = serde_json::json!(self.dimensions);
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| IndexerError::Embedding(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(IndexerError::Embedding(format!(
                "OpenAI returned status {}: {}",
                status, body
            )));
        }

        let json: Value = response
            .json()
            .map_err(|e| IndexerError::Embedding(format!("OpenAI response parse error: {e}")))?;

        let data = json
            .get("data")
            .and_then(|v| v.as_array())
            .ok_or_else(|| IndexerError::Embedding("Missing data in OpenAI response".into()))?;

        // Results carry an `index`; order by it rather than trusting response order.
        let mut rows: Vec<(u64, Vec<f32>)> = Vec::with_capacity(data.len());
        for (pos, item) in data.iter().enumerate() {
            let index = item
                .get("index")
                .and_then(|v| v.as_u64())
                .unwrap_or(pos as u64);
            let embedding = item
                .get("embedding")
                .and_then(|v| v.as_array())
                .ok_or_else(|| {
                    IndexerError::Embedding("Missing embedding in OpenAI response".into())
                })?
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect();
            rows.push((index, embedding));
        }
        rows.sort_by_key(|(index, _)| *index);
        Ok(rows.into_iter().map(|(_, e)| e).collect())
    }
}

impl super::EmbeddingProvider for OpenAIProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexerError> {
        self.request(Value::String(text.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| IndexerError::Embedding("Empty OpenAI response".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexerError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(serde_json::json!(texts))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
