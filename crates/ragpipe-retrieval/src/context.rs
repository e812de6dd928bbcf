//! Context assembly with stable citations.

use ragpipe_core::{Chunk, Context, ContextConfig, ContextEntry, ScoredChunk};
use tracing::debug;

/// Renders the final ranked chunks into a citation-tagged context block.
///
/// Citation indices are assigned 1..N in rank order before any budgeting.
/// When the rendered whole exceeds the character budget, entries are dropped
/// lowest-ranked first; the survivors keep their original numbers, so a
/// citation in the generated answer always resolves to the same chunk.
pub struct ContextAssembler {
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Assemble `ranked` into a rendered context under the budget.
    pub fn assemble(&self, ranked: &[ScoredChunk]) -> Context {
        let entries: Vec<ContextEntry> = ranked
            .iter()
            .enumerate()
            .map(|(i, scored)| ContextEntry {
                citation: i + 1,
                chunk: scored.chunk.clone(),
            })
            .collect();
        let rendered: Vec<String> = entries
            .iter()
            .map(|e| render_entry(e.citation, &e.chunk, self.config.max_chunk_chars))
            .collect();
        let lengths: Vec<usize> = rendered.iter().map(|r| r.chars().count()).collect();

        let mut keep = entries.len();
        while keep > 0 {
            let separators = 2 * keep.saturating_sub(1);
            let total: usize = lengths[..keep].iter().sum::<usize>() + separators;
            if total <= self.config.max_context_chars {
                break;
            }
            keep -= 1;
            debug!("Context budget exceeded, dropping citation [{}]", keep + 1);
        }

        Context {
            entries: entries[..keep].to_vec(),
            rendered: rendered[..keep].join("\n\n"),
        }
    }
}

/// Render one entry as a citation header plus the truncated chunk text.
fn render_entry(citation: usize, chunk: &Chunk, max_chars: usize) -> String {
    format!(
        "[{}] (source: {}, page: {}, type: {})\n{}",
        citation,
        chunk.source,
        chunk.page,
        chunk.content_type,
        truncate_chars(&chunk.text, max_chars)
    )
}

/// Truncate to at most `max_chars` characters, on a character boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
