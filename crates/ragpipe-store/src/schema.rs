//! Elasticsearch index definition for chunk documents.

use ragpipe_core::IndexSchema;
use serde_json::{json, Value};

/// Index creation body: settings plus the chunk document mapping.
///
/// Only the vector dimension varies between indexes; the field set is the
/// document shape of [`Chunk`](ragpipe_core::Chunk).
#[must_use]
pub fn index_body(schema: &IndexSchema) -> Value {
    json!({
        "settings": {
            "number_of_shards": schema.shards,
            "number_of_replicas": schema.replicas
        },
        "mappings": {
            "properties": {
                // Content
                "text": { "type": "text" },
                "embedding": {
                    "type": "dense_vector",
                    "dims": schema.vector_dims,
                    "index": true,
                    "similarity": "cosine"
                },
                // Provenance
                "source": { "type": "keyword" },
                "page": { "type": "integer" },
                "content_type": { "type": "keyword" },
                "chunk_id": { "type": "keyword" }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_body_carries_dimension() {
        let body = index_body(&IndexSchema::new(1024));
        assert_eq!(body["mappings"]["properties"]["embedding"]["dims"], 1024);
        assert_eq!(
            body["mappings"]["properties"]["embedding"]["similarity"],
            "cosine"
        );
        assert_eq!(body["mappings"]["properties"]["embedding"]["index"], true);
    }

    #[test]
    fn test_index_body_single_node_settings() {
        let body = index_body(&IndexSchema::new(384));
        assert_eq!(body["settings"]["number_of_shards"], 1);
        assert_eq!(body["settings"]["number_of_replicas"], 0);
    }

    #[test]
    fn test_index_body_field_types() {
        let props = &index_body(&IndexSchema::new(384))["mappings"]["properties"];
        assert_eq!(props["text"]["type"], "text");
        assert_eq!(props["source"]["type"], "keyword");
        assert_eq!(props["page"]["type"], "integer");
        assert_eq!(props["content_type"]["type"], "keyword");
        assert_eq!(props["chunk_id"]["type"], "keyword");
    }
}
