//! Query engine: retrieve the most similar nodes, then let the chat model
//! answer from them.

use super::{SearchResult, VectorIndex};
use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::{ChartQaError, Result};
use crate::llm::{ChatModel, ChatRequest};
use async_openai::types::ChatCompletionRequestUserMessageArgs;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Returned when retrieval finds nothing to answer from.
pub const EMPTY_RESPONSE: &str = "Empty Response";

/// Answer produced by a [`QueryEngine`].
#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SearchResult>,
}

/// Retrieval + synthesis over one [`VectorIndex`].
pub struct QueryEngine {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    prompt: String,
    top_k: usize,
}

impl QueryEngine {
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            chat,
            prompt: Prompts::default().query_synthesis,
            top_k,
        }
    }

    /// Use a custom synthesis template (`{{context}}`, `{{query}}`).
    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.prompt = prompt.to_string();
        self
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Retrieve the top-k nodes for a query.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>> {
        let embedding = self.embedder.embed(query).await?;
        Ok(self.index.search(&embedding, self.top_k))
    }

    /// Answer a query from the retrieved nodes.
    #[instrument(skip(self), fields(index = %self.index.name))]
    pub async fn query(&self, query: &str) -> Result<QueryResponse> {
        let sources = self.retrieve(query).await?;
        if sources.is_empty() {
            return Ok(QueryResponse {
                answer: EMPTY_RESPONSE.to_string(),
                sources,
            });
        }
        debug!("Retrieved {} node(s)", sources.len());

        let mut vars = HashMap::new();
        vars.insert("context", format_context(&sources));
        vars.insert("query", query.to_string());
        let prompt = Prompts::render(&self.prompt, &vars);

        let request = ChatRequest {
            messages: vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| ChartQaError::Agent(e.to_string()))?
                .into()],
            ..Default::default()
        };

        let turn = self.chat.complete(request).await?;
        let answer = turn
            .content
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| EMPTY_RESPONSE.to_string());

        Ok(QueryResponse { answer, sources })
    }
}

/// Format retrieved nodes as the context block of the synthesis prompt.
fn format_context(sources: &[SearchResult]) -> String {
    sources
        .iter()
        .map(|r| {
            format!(
                "source: {} (page {})\n\n{}",
                r.node.source, r.node.page, r.node.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
