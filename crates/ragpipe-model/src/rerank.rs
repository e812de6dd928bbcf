//! HTTP reranking adapter for cross-encoder scoring services.

use async_trait::async_trait;
use ragpipe_core::{Chunk, ModelError, Reranker, ScoredChunk};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

/// Reranker backed by a `/rerank` endpoint.
///
/// The service scores each (query, document) pair with a cross-encoder and
/// returns `(index, relevance_score)` pairs referring back to the submitted
/// document order. Results are re-sorted locally, so a service that returns
/// them unsorted still yields a correct ranking.
pub struct ApiReranker {
    client: Client,
    url: String,
    model: String,
}

impl ApiReranker {
    /// Adapter for the service at `url` (the full endpoint, e.g.
    /// `http://localhost:8001/rerank`).
    #[must_use]
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Reranker for ApiReranker {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn rerank(
        &self,
        query: &str,
        chunks: Vec<Chunk>,
        top_n: usize,
    ) -> Result<Vec<ScoredChunk>, ModelError> {
        if chunks.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let documents: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let response = self
            .client
            .post(&self.url)
            .json(&RerankRequest {
                model: &self.model,
                query,
                documents,
                top_n,
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

        let body: RerankResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Response(e.to_string()))?;
        ranked_from_response(body, &chunks, top_n)
    }
}

/// Resolve result indices back to chunks, sorted by descending score.
fn ranked_from_response(
    mut body: RerankResponse,
    chunks: &[Chunk],
    top_n: usize,
) -> Result<Vec<ScoredChunk>, ModelError> {
    for result in &body.results {
        if result.index >= chunks.len() {
            return Err(ModelError::Response(format!(
                "rerank result index {} out of range for {} documents",
                result.index,
                chunks.len()
            )));
        }
    }

    body.results.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    body.results.truncate(top_n);

    Ok(body
        .results
        .into_iter()
        .map(|r| ScoredChunk {
            chunk: chunks[r.index].clone(),
            score: r.relevance_score,
        })
        .collect())
}
