//! Elasticsearch-backed document store.

use async_trait::async_trait;
use ragpipe_core::{
    Chunk, DocumentStore, IndexCreation, IndexSchema, IndexStats, ScoredChunk, StoreError,
};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use crate::schema;

/// Document store speaking the Elasticsearch HTTP API.
///
/// Documents are written one `PUT {index}/_doc/{chunk_id}` at a time;
/// batching and concurrency belong to the caller. Writes become searchable
/// after [`refresh`](DocumentStore::refresh), which the ingestion pipeline
/// calls once per run.
pub struct ElasticStore {
    client: Client,
    base_url: String,
}

impl ElasticStore {
    /// Store talking to the node at `base_url`, e.g. `http://localhost:9200`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Store reusing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Vector dimension currently mapped for an existing index.
    async fn mapped_dims(&self, index: &str) -> Result<usize, StoreError> {
        let response = self
            .client
            .get(self.url(&format!("{index}/_mapping")))
            .send()
            .await
            .map_err(connection_err)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::IndexNotFound(index.to_string()));
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Response(e.to_string()))?;
        body[index]["mappings"]["properties"]["embedding"]["dims"]
            .as_u64()
            .map(|d| d as usize)
            .ok_or_else(|| {
                StoreError::Response(format!("no embedding dimension mapped for '{index}'"))
            })
    }

    async fn search(&self, index: &str, body: Value) -> Result<Vec<ScoredChunk>, StoreError> {
        let response = self
            .client
            .post(self.url(&format!("{index}/_search")))
            .json(&body)
            .send()
            .await
            .map_err(connection_err)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::IndexNotFound(index.to_string()));
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Response(e.to_string()))?;
        parse_hits(&body)
    }
}

fn connection_err(e: reqwest::Error) -> StoreError {
    StoreError::Connection(e.to_string())
}

async fn api_error(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    StoreError::Api { status, message }
}

/// Query body for a full-text match on the `text` field.
fn lexical_body(query: &str, limit: usize) -> Value {
    json!({
        "query": { "match": { "text": { "query": query } } },
        "size": limit,
        "_source": ["chunk_id", "text", "source", "page", "content_type"]
    })
}

/// Query body for a kNN search on the `embedding` field.
///
/// The optional `similarity` floor makes Elasticsearch drop hits below the
/// raw cosine similarity before ranking.
fn knn_body(vector: &[f32], limit: usize, threshold: Option<f32>) -> Value {
    let mut knn = json!({
        "field": "embedding",
        "query_vector": vector,
        "k": limit,
        "num_candidates": (limit * 10).max(50)
    });
    if let Some(min) = threshold {
        knn["similarity"] = json!(min);
    }
    json!({
        "knn": knn,
        "size": limit,
        "_source": ["chunk_id", "text", "source", "page", "content_type"]
    })
}

fn parse_hits(body: &Value) -> Result<Vec<ScoredChunk>, StoreError> {
    let hits = body["hits"]["hits"]
        .as_array()
        .ok_or_else(|| StoreError::Response("missing hits in search response".to_string()))?;

    hits.iter()
        .map(|hit| {
            let score = hit["_score"].as_f64().unwrap_or(0.0) as f32;
            let chunk: Chunk = serde_json::from_value(hit["_source"].clone())
                .map_err(|e| StoreError::Response(format!("malformed hit source: {e}")))?;
            Ok(ScoredChunk { chunk, score })
        })
        .collect()
}

#[async_trait]
impl DocumentStore for ElasticStore {
    async fn create_index(
        &self,
        index: &str,
        schema: IndexSchema,
    ) -> Result<IndexCreation, StoreError> {
        if self.index_exists(index).await? {
            let mapped = self.mapped_dims(index).await?;
            if mapped != schema.vector_dims {
                return Err(StoreError::SchemaConflict {
                    index: index.to_string(),
                    expected: schema.vector_dims,
                    actual: mapped,
                });
            }
            return Ok(IndexCreation::AlreadyExists);
        }

        let response = self
            .client
            .put(self.url(index))
            .json(&schema::index_body(&schema))
            .send()
            .await
            .map_err(connection_err)?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        debug!(
            "Created index '{}' (dimension: {})",
            index, schema.vector_dims
        );
        Ok(IndexCreation::Created)
    }

    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        let response = self
            .client
            .head(self.url(index))
            .send()
            .await
            .map_err(connection_err)?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(api_error(response).await),
        }
    }

    async fn delete_index(&self, index: &str) -> Result<bool, StoreError> {
        let response = self
            .client
            .delete(self.url(index))
            .send()
            .await
            .map_err(connection_err)?;
        match response.status() {
            s if s.is_success() => {
                debug!("Deleted index '{}'", index);
                Ok(true)
            }
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(api_error(response).await),
        }
    }

    async fn upsert_chunks(&self, index: &str, chunks: &[Chunk]) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        // The whole batch is validated against the mapped dimension before
        // the first write.
        let expected = self.mapped_dims(index).await?;
        for chunk in chunks {
            match &chunk.embedding {
                None => return Err(StoreError::MissingEmbedding(chunk.id.clone())),
                Some(vector) if vector.len() != expected => {
                    return Err(StoreError::DimensionMismatch {
                        chunk_id: chunk.id.clone(),
                        expected,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
            }
        }

        for chunk in chunks {
            let response = self
                .client
                .put(self.url(&format!("{index}/_doc/{}", chunk.id)))
                .json(chunk)
                .send()
                .await
                .map_err(connection_err)?;
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }
        }

        debug!("Upserted {} chunks into '{}'", chunks.len(), index);
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.url(&format!("{index}/_refresh")))
            .send()
            .await
            .map_err(connection_err)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::IndexNotFound(index.to_string()));
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    async fn search_lexical(
        &self,
        index: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        self.search(index, lexical_body(query, limit)).await
    }

    async fn search_vector(
        &self,
        index: &str,
        vector: &[f32],
        limit: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        self.search(index, knn_body(vector, limit, threshold)).await
    }

    async fn stats(&self, index: &str) -> Result<IndexStats, StoreError> {
        let response = self
            .client
            .get(self.url(&format!("{index}/_stats")))
            .send()
            .await
            .map_err(connection_err)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::IndexNotFound(index.to_string()));
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Response(e.to_string()))?;
        let total = &body["indices"][index]["total"];

        Ok(IndexStats {
            doc_count: total["docs"]["count"].as_u64().unwrap_or(0),
            size_bytes: total["store"]["size_in_bytes"].as_u64().unwrap_or(0),
            last_updated: None,
        })
    }
}
