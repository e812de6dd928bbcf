//! Word-boundary chunking of extracted content blocks.

use ragpipe_core::{Block, Chunk, ChunkConfig, ChunkError, ContentType};
use tracing::warn;

/// Splits extracted blocks into bounded, overlapping chunks.
///
/// Text blocks are windowed at word boundaries so no chunk exceeds
/// `chunk_size` characters; consecutive windows carry about
/// `chunk_overlap` characters of trailing context, clamped so every window
/// still advances. Image captions and linearized tables are already
/// condensed and pass through as one chunk each.
///
/// Chunk ids are a hash of the block's position within its source, so
/// re-chunking the same input always reproduces the same ids.
pub struct BlockChunker {
    config: ChunkConfig,
}

impl BlockChunker {
    /// Create a chunker with the given configuration.
    pub fn new(config: ChunkConfig) -> Result<Self, ChunkError> {
        if config.chunk_size == 0 {
            return Err(ChunkError::InvalidConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(ChunkError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    /// Chunk a source document's extracted blocks.
    ///
    /// Blocks with no text after trimming are skipped with a warning. A
    /// source whose blocks all end up empty yields
    /// [`ChunkError::EmptySource`] rather than an empty chunk list.
    pub fn chunk(&self, source: &str, blocks: &[Block]) -> Result<Vec<Chunk>, ChunkError> {
        let mut chunks = Vec::new();

        for (block_index, block) in blocks.iter().enumerate() {
            let text = block.text.trim();
            if text.is_empty() {
                warn!(
                    "Skipping empty {} block {} of '{}'",
                    block.content_type, block_index, source
                );
                continue;
            }

            match block.content_type {
                // Captions and tables are pre-condensed, one chunk each.
                ContentType::Image | ContentType::Table => {
                    chunks.push(self.make_chunk(source, block, block_index, 0, text.to_string()));
                }
                ContentType::Text => {
                    for (offset, window) in windows(text, &self.config) {
                        chunks.push(self.make_chunk(source, block, block_index, offset, window));
                    }
                }
            }
        }

        if chunks.is_empty() {
            return Err(ChunkError::EmptySource(source.to_string()));
        }
        Ok(chunks)
    }

    fn make_chunk(
        &self,
        source: &str,
        block: &Block,
        block_index: usize,
        offset: usize,
        text: String,
    ) -> Chunk {
        Chunk {
            id: chunk_id(source, block.page, block.content_type, block_index, offset),
            text,
            embedding: None,
            source: source.to_string(),
            page: block.page,
            content_type: block.content_type,
        }
    }
}

/// Deterministic chunk id from the chunk's position within its source.
///
/// Two ingestions of identical input produce identical ids, so re-ingestion
/// overwrites rather than duplicates.
fn chunk_id(
    source: &str,
    page: u32,
    content_type: ContentType,
    block_index: usize,
    offset: usize,
) -> String {
    let key = format!("{source}|{page}|{content_type}|{block_index}|{offset}");
    blake3::hash(key.as_bytes()).to_hex()[..16].to_string()
}

/// Word-boundary windows over a text block.
///
/// Returns `(char_offset, window_text)` pairs where the offset is the
/// window's starting character within the trimmed block. Windows never
/// exceed `chunk_size` characters; a single word longer than the budget is
/// hard-split at the character limit so the cap holds unconditionally.
fn windows(text: &str, config: &ChunkConfig) -> Vec<(usize, String)> {
    let chars: Vec<char> = text.chars().collect();

    // (start, end) char offsets of each whitespace-delimited word.
    let mut words: Vec<(usize, usize)> = Vec::new();
    let mut word_start: Option<usize> = None;
    for (idx, ch) in chars.iter().enumerate() {
        if ch.is_whitespace() {
            if let Some(start) = word_start.take() {
                words.push((start, idx));
            }
        } else if word_start.is_none() {
            word_start = Some(idx);
        }
    }
    if let Some(start) = word_start {
        words.push((start, chars.len()));
    }

    let mut out = Vec::new();
    let mut i = 0;
    while i < words.len() {
        // Grow the window while the next word still fits the budget.
        let mut j = i;
        while j + 1 < words.len() && words[j + 1].1 - words[i].0 <= config.chunk_size {
            j += 1;
        }

        if words[j].1 - words[i].0 > config.chunk_size {
            // Single word over budget (j == i): split it at the limit.
            let (start, end) = words[i];
            let mut piece_start = start;
            while piece_start < end {
                let piece_end = (piece_start + config.chunk_size).min(end);
                out.push((
                    piece_start,
                    chars[piece_start..piece_end].iter().collect(),
                ));
                piece_start = piece_end;
            }
            i += 1;
            continue;
        }

        out.push((words[i].0, chars[words[i].0..words[j].1].iter().collect()));

        if j + 1 >= words.len() {
            break;
        }

        if config.chunk_overlap == 0 || j == i {
            i = j + 1;
        } else {
            // Back up whole words until the carried tail reaches the
            // overlap target. k > i keeps the walk moving forward.
            let mut k = j;
            while k > i + 1 && words[j].1 - words[k].0 < config.chunk_overlap {
                k -= 1;
            }
            i = k;
        }
    }

    out
}
