//! Document indexes: an in-memory vector index, its on-disk persistence,
//! and the query engine that answers questions from it.

mod query;
mod store;

pub use query::{QueryEngine, QueryResponse, EMPTY_RESPONSE};
pub use store::{load_index, persist_index, DocumentIndexStore, FORMAT_VERSION, INDEX_FILE};

use crate::embedding::cosine_similarity;
use serde::Serialize;
use uuid::Uuid;

/// An embedded chunk of a source document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: Uuid,
    /// Path of the source file, as configured.
    pub source: String,
    pub page: u32,
    pub chunk_order: u32,
    pub content: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// A retrieved node with its similarity score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub node: Node,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Immutable vector index over one document collection.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    pub name: String,
    /// Embedding model the nodes were embedded with.
    pub embedding_model: String,
    pub dimensions: usize,
    pub nodes: Vec<Node>,
}

impl VectorIndex {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-k nodes by cosine similarity. Ties keep insertion order.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = self
            .nodes
            .iter()
            .map(|node| SearchResult {
                node: node.clone(),
                score: cosine_similarity(query_embedding, &node.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        results
    }
}
