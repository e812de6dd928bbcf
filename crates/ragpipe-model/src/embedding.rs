//! HTTP embedding adapter for OpenAI-compatible services.

use async_trait::async_trait;
use ragpipe_core::{Embedder, ModelError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedder backed by an OpenAI-compatible `/v1/embeddings` endpoint.
///
/// Works against any service speaking that wire format, local or hosted.
/// The configured dimension is enforced on every response.
pub struct ApiEmbedder {
    client: Client,
    url: String,
    model: String,
    dimension: usize,
}

impl ApiEmbedder {
    /// Adapter for the service at `url` (the full endpoint, e.g.
    /// `http://localhost:8000/v1/embeddings`).
    #[must_use]
    pub fn new(url: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for ApiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ModelError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.url)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| ModelError::Connection(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ModelError::Api { status, message });
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Response(e.to_string()))?;
        vectors_from_response(body, texts.len(), self.dimension)
    }
}

/// Order embeddings by their reported index and validate count and shape.
fn vectors_from_response(
    mut body: EmbedResponse,
    expected: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, ModelError> {
    if body.data.len() != expected {
        return Err(ModelError::Response(format!(
            "expected {} embeddings, got {}",
            expected,
            body.data.len()
        )));
    }

    body.data.sort_by_key(|d| d.index);
    body.data
        .into_iter()
        .map(|d| {
            if d.embedding.len() != dimension {
                return Err(ModelError::Response(format!(
                    "embedding {} has dimension {}, expected {}",
                    d.index,
                    d.embedding.len(),
                    dimension
                )));
            }
            Ok(d.embedding)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = EmbedRequest {
            model: "bge-large-en-v1.5",
            input: &["first", "second"],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "bge-large-en-v1.5");
        assert_eq!(json["input"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_response_ordered_by_index() {
        let body: EmbedResponse = serde_json::from_str(
            r#"{
                "data": [
                    { "index": 1, "embedding": [0.3, 0.4] },
                    { "index": 0, "embedding": [0.1, 0.2] }
                ]
            }"#,
        )
        .unwrap();

        let vectors = vectors_from_response(body, 2, 2).unwrap();
        assert_eq!(vectors[0], vec![0.1, 0.2]);
        assert_eq!(vectors[1], vec![0.3, 0.4]);
    }

    #[test]
    fn test_response_count_mismatch_rejected() {
        let body: EmbedResponse =
            serde_json::from_str(r#"{ "data": [ { "index": 0, "embedding": [0.1] } ] }"#).unwrap();
        let result = vectors_from_response(body, 2, 1);
        assert!(matches!(result, Err(ModelError::Response(_))));
    }

    #[test]
    fn test_response_dimension_mismatch_rejected() {
        let body: EmbedResponse =
            serde_json::from_str(r#"{ "data": [ { "index": 0, "embedding": [0.1, 0.2] } ] }"#)
                .unwrap();
        let result = vectors_from_response(body, 1, 3);
        assert!(matches!(result, Err(ModelError::Response(_))));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_the_service() {
        // Any request would fail against this address; empty input must not
        // produce one.
        let embedder = ApiEmbedder::new("http://127.0.0.1:1/v1/embeddings", "m", 4);
        let vectors = embedder.embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[test]
    fn test_metadata_accessors() {
        let embedder = ApiEmbedder::new("http://localhost:8000/v1/embeddings", "bge", 1024);
        assert_eq!(embedder.model_name(), "bge");
        assert_eq!(embedder.dimension(), 1024);
    }
}
