
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::documents::RawDocument;

/// Configuration for the sliding-window chunker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters.
    pub chunk_size: usize,
    /// Overlap in characters between adjacent chunks. Must be smaller than
    /// `chunk_size`; enforced by config validation.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// A text span produced by splitting one raw document. Tenant and access
/// metadata are attached later, at ingestion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub text: String,
    /// Name of the file this chunk originated from.
    pub source_filename: String,
    /// Position of this chunk within its source document.
    pub chunk_index: u32,
}

/// Split raw documents into overlapping fixed-size chunks.
///
/// The split is a deterministic sliding window over characters: window
/// `chunk_size`, stride `chunk_size - overlap`. Documents shorter than one
/// window produce exactly one chunk; empty documents produce none.
#[inline]
pub fn chunk_documents(documents: &[RawDocument], config: &ChunkingConfig) -> Vec<DocumentChunk> {
    let mut chunks = Vec::new();

    for document in documents {
        let produced = chunk_text(&document.text, config);
        debug!(
            source = %document.source_filename,
            chunks = produced.len(),
            "Chunked document"
        );

        for (index, text) in produced.into_iter().enumerate() {
            chunks.push(DocumentChunk {
                text,
                source_filename: document.source_filename.clone(),
                chunk_index: index as u32,
            });
        }
    }

    chunks
}

/// Sliding-window split of a single text. Operates on character boundaries so
/// multi-byte input never splits inside a code point.
fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= config.chunk_size {
        return vec![text.to_string()];
    }

    let stride = config.chunk_size - config.overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());

        if end == chars.len() {
            break;
        }
        start += stride;
    }

    chunks
}
