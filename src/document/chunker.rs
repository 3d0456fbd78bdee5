//! Word-window chunking.
//!
//! Splits each page into fixed-size windows of words with a configurable
//! overlap, so a fact straddling a boundary still lands whole in one chunk.

use super::SourceDocument;
use crate::config::ChunkingSettings;
use crate::error::{ChartQaError, Result};
use std::path::PathBuf;

/// A chunk of text ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub source: PathBuf,
    pub page: u32,
    /// Order of this chunk within its source file.
    pub order: u32,
    pub content: String,
}

/// Fixed-size word-window chunker.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_words: usize,
    overlap_words: usize,
}

impl Chunker {
    pub fn new(chunk_words: usize, overlap_words: usize) -> Result<Self> {
        if chunk_words == 0 || overlap_words >= chunk_words {
            return Err(ChartQaError::Config(format!(
                "invalid chunking window: {} words with {} overlap",
                chunk_words, overlap_words
            )));
        }
        Ok(Self {
            chunk_words,
            overlap_words,
        })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Self::new(settings.chunk_words, settings.overlap_words)
    }

    /// Chunk a sequence of pages. Chunk order restarts for every source file.
    pub fn chunk(&self, documents: &[SourceDocument]) -> Vec<Chunk> {
        let step = self.chunk_words - self.overlap_words;
        let mut chunks = Vec::new();
        let mut current_source: Option<&PathBuf> = None;
        let mut order = 0;

        for doc in documents {
            if current_source != Some(&doc.source) {
                current_source = Some(&doc.source);
                order = 0;
            }

            let words: Vec<&str> = doc.text.split_whitespace().collect();
            let mut start = 0;

            while start < words.len() {
                let end = (start + self.chunk_words).min(words.len());
                chunks.push(Chunk {
                    source: doc.source.clone(),
                    page: doc.page,
                    order,
                    content: words[start..end].join(" "),
                });
                order += 1;

                if end == words.len() {
                    break;
                }
                start += step;
            }
        }

        chunks
    }
}
