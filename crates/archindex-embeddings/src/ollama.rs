//! Ollama embedding provider.
//!
//! Uses Ollama's local API to generate embeddings.
//! Default model: mxbai-embed-large (1024 dimensions).

use archindex_core::IndexerError;
use serde_json::Value;

/// Default Ollama base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default Ollama embedding model.
pub const DEFAULT_MODEL: &str = "mxbai-embed-large";

/// Ollama embedding provider.
pub struct OllamaProvider {
    base_url: String,
    model: String,
    dimensions: usize,
    client: reqwest::blocking::Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider.
    pub fn new(base_url: &str, model: &str, dimensions: usize) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Create with default settings (localhost:11434, mxbai-embed-large).
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_MODEL, super::DIMENSIONS)
    }

    fn post(&self, path: &str, body: Value) -> Result<Value, IndexerError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| IndexerError::Embedding(format!("Ollama request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IndexerError::Embedding(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .map_err(|e| IndexerError::Embedding(format!("Ollama response parse error: {e}")))
    }
}

fn to_vector(value: &Value) -> Option<Vec<f32>> {
    Some(
        value
            .as_array()?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect(),
    )
}

impl super::EmbeddingProvider for OllamaProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexerError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
        });
        let json = self.post("/api/embeddings", body)?;

        json.get("embedding")
            .and_then(to_vector)
            .ok_or_else(|| IndexerError::Embedding("Missing 'embedding' field in response".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexerError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = self.post("/api/embed", body)?;

        json.get("embeddings")
            .and_then(|v| v.as_array())
            .ok_or_else(|| IndexerError::Embedding("Missing 'embeddings' field in response".into()))?
            .iter()
            .map(|row| {
                to_vector(row)
                    .ok_or_else(|| IndexerError::Embedding("Malformed embedding row".into()))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmbeddingProvider;

    #[test]
    fn ollama_provider_construction() {
        let provider = OllamaProvider::with_defaults();
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(provider.model, DEFAULT_MODEL);
        assert_eq!(provider.dimensions, 1024);
    }

    #[test]
    fn ollama_provider_trims_trailing_slash() {
        let provider = OllamaProvider::new("http://myhost:11434/", "nomic-embed-text", 768);
        assert_eq!(provider.base_url, "http://myhost:11434");
        assert_eq!(EmbeddingProvider::dimensions(&provider), 768);
    }

    #[test]
    fn ollama_embed_success_mock() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding": [0.1, 0.2, 0.3]}"#)
            .create();

        let provider = OllamaProvider::new(&server.url(), "nomic-embed-text", 3);
        let result = provider.embed("test");
        mock.assert();

        let embedding = result.unwrap();
        assert_eq!(embedding.len(), 3);
        assert!((embedding[0] - 0.1).abs() < 1e-6);
        assert!((embedding[2] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn ollama_embed_batch_mock() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/embed")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embeddings": [[1.0, 0.0], [0.0, 1.0]]}"#)
            .create();

        let provider = OllamaProvider::new(&server.url(), "nomic-embed-text", 2);
        let result = provider.embed_batch(&["a", "b"]).unwrap();
        mock.assert();
        assert_eq!(result, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn ollama_embed_server_error_mock() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/embeddings")
            .with_status(500)
            .with_body("Internal Server Error")
            .create();

        let provider = OllamaProvider::new(&server.url(), "nomic-embed-text", 768);
        let result = provider.embed("test");
        mock.assert();

        assert!(matches!(result, Err(IndexerError::Embedding(_))));
    }
}
