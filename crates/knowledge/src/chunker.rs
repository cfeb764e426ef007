//! Paragraph-aware text chunking with a sliding overlap.
//!
//! Chunk boundaries prefer the position right after a separator. When no
//! separator falls inside the size window the chunk is hard-split at
//! `target_size` characters. Every chunk after the first starts `overlap`
//! characters before the end of its predecessor, so stripping the declared
//! overlaps and concatenating rebuilds the input exactly.

use crate::config::KnowledgeConfig;
use crate::types::Chunk;
use cardio_core::{AppError, AppResult};

/// Chunking parameters. Sizes are counted in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub separator: String,
    pub target_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            separator: "\n\n".to_string(),
            target_size: 1000,
            overlap: 200,
        }
    }
}

impl From<&KnowledgeConfig> for ChunkerConfig {
    fn from(config: &KnowledgeConfig) -> Self {
        Self {
            separator: config.separator.clone(),
            target_size: config.chunk_size,
            overlap: config.chunk_overlap,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.target_size == 0 {
            return Err(AppError::Config(
                "Chunk size must be greater than zero".to_string(),
            ));
        }

        if self.overlap >= self.target_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.target_size
            )));
        }

        Ok(())
    }
}

/// Split text into overlapping chunks.
pub fn split(text: &str, config: &ChunkerConfig) -> AppResult<Vec<Chunk>> {
    config.validate()?;

    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of every char, plus the end of the text.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = offsets.len() - 1;
    let breaks = break_points(text, &config.separator, &offsets);

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut prev_end = 0usize;
    let mut overlap_with_previous = 0usize;

    loop {
        let limit = start + config.target_size;
        let within = breaks.partition_point(|&b| b <= limit);
        let end = match within.checked_sub(1).map(|i| breaks[i]) {
            Some(b) if b > prev_end => b,
            _ => limit.min(total_chars),
        };

        chunks.push(Chunk {
            text: text[offsets[start]..offsets[end]].to_string(),
            sequence_index: chunks.len(),
            overlap_with_previous,
        });

        if end >= total_chars {
            break;
        }

        overlap_with_previous = config.overlap.min(end - start);
        start = end - overlap_with_previous;
        prev_end = end;
    }

    tracing::debug!(
        "Chunked {} chars into {} chunks (size: {}, overlap: {})",
        total_chars,
        chunks.len(),
        config.target_size,
        config.overlap
    );

    Ok(chunks)
}

/// Char positions right after each separator occurrence, plus end of text.
fn break_points(text: &str, separator: &str, offsets: &[usize]) -> Vec<usize> {
    let total_chars = offsets.len() - 1;
    let mut breaks: Vec<usize> = if separator.is_empty() {
        Vec::new()
    } else {
        text.match_indices(separator)
            .filter_map(|(i, sep)| offsets.binary_search(&(i + sep.len())).ok())
            .collect()
    };

    if breaks.last() != Some(&total_chars) {
        breaks.push(total_chars);
    }
    breaks
}
