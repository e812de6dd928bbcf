//! Query expansion via the chat model.

use std::sync::Arc;

use ragpipe_core::{GenerationParams, Generator, Query};
use tracing::{debug, warn};

const EXPANSION_SYSTEM_PROMPT: &str = "You are a search assistant. You rewrite \
    questions into alternative phrasings that improve document retrieval.";

/// Generates alternative phrasings of a user question.
///
/// Expansion is best-effort: any model failure degrades to the raw query
/// alone, so retrieval is never blocked on it.
pub struct QueryExpander {
    generator: Arc<dyn Generator>,
}

impl QueryExpander {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Expand `raw` into up to `n` variations, the raw question always first.
    ///
    /// Model output is read one phrasing per line; lines are trimmed, list
    /// markers stripped, and duplicates or echoes of the raw question
    /// dropped, so the result may hold fewer than `n` variations.
    pub async fn expand(&self, raw: &str, n: usize) -> Query {
        if n <= 1 {
            return Query::single(raw);
        }

        let user = format!(
            "Generate {} alternative phrasings of the following question. \
             Keep each one self-contained and semantically equivalent. \
             Return one phrasing per line, with no numbering or commentary.\n\n\
             Question: {}",
            n - 1,
            raw
        );
        let params = GenerationParams {
            temperature: 0.7,
            max_tokens: 256,
        };

        match self
            .generator
            .generate(EXPANSION_SYSTEM_PROMPT, &user, params)
            .await
        {
            Ok(text) => {
                let rephrasings = parse_rephrasings(&text, raw, n - 1);
                debug!(
                    "Expanded query into {} variations",
                    rephrasings.len() + 1
                );
                Query::with_variations(raw, rephrasings)
            }
            Err(e) => {
                warn!("Query expansion failed ({}), using the raw query only", e);
                Query::single(raw)
            }
        }
    }
}

/// Extract up to `limit` usable rephrasings from model output.
fn parse_rephrasings(text: &str, raw: &str, limit: usize) -> Vec<String> {
    let mut rephrasings: Vec<String> = Vec::new();
    for line in text.lines() {
        let candidate = strip_list_marker(line);
        if candidate.is_empty() || candidate.eq_ignore_ascii_case(raw.trim()) {
            continue;
        }
        if rephrasings.iter().any(|r| r.eq_ignore_ascii_case(candidate)) {
            continue;
        }
        rephrasings.push(candidate.to_string());
        if rephrasings.len() == limit {
            break;
        }
    }
    rephrasings
}

/// Strip a leading list marker ("1.", "2)", "-", "*") from a line.
fn strip_list_marker(line: &str) -> &str {
    let trimmed = line.trim();
    let after_digits = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
    let unnumbered = if after_digits.len() < trimmed.len() {
        // Only treat digits as a marker when "." or ")" follows them.
        after_digits.strip_prefix(['.', ')']).unwrap_or(trimmed)
    } else {
        trimmed
    };
    unnumbered.trim_start_matches(['-', '*']).trim()
}
