//! Embedding-based tool selection.

use super::{Tool, ToolRegistry};
use crate::embedding::{cosine_similarity, Embedder};
use crate::error::Result;
use std::sync::Arc;
use tracing::debug;

/// Default number of tools offered per question.
pub const DEFAULT_TOOL_TOP_K: usize = 5;

/// Ranks registered tools against a question by embedding similarity.
pub struct ToolRetriever {
    embedder: Arc<dyn Embedder>,
    entries: Vec<(Arc<dyn Tool>, Vec<f32>)>,
    top_k: usize,
}

impl ToolRetriever {
    /// Embed `"<name>: <description>"` for every registered tool.
    pub async fn build(
        registry: &ToolRegistry,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) -> Result<Self> {
        let texts: Vec<String> = registry
            .tools()
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect();

        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed_batch(&texts).await?
        };

        let entries = registry.tools().iter().cloned().zip(embeddings).collect();

        Ok(Self {
            embedder,
            entries,
            top_k,
        })
    }

    /// Tools most relevant to `question`, best first. Ties keep
    /// registration order.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<Arc<dyn Tool>>> {
        if self.entries.is_empty() || self.top_k == 0 {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed(question).await?;
        let mut scored: Vec<(f32, &Arc<dyn Tool>)> = self
            .entries
            .iter()
            .map(|(tool, embedding)| (cosine_similarity(&query, embedding), tool))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let selected: Vec<Arc<dyn Tool>> = scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, tool)| Arc::clone(tool))
            .collect();

        debug!(
            "Selected tools: {:?}",
            selected.iter().map(|t| t.name()).collect::<Vec<_>>()
        );
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::testing::HashEmbedder;
    use crate::tools::ToolOutput;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Named(&'static str, &'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            self.1
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn call(&self, _args: Value) -> Result<ToolOutput> {
            Ok(ToolOutput::text(""))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for (name, description) in [
            ("textdata", "report text paragraphs"),
            ("chartdata", "chart data values"),
            ("bar", "bar chart creator"),
            ("line", "line chart creator"),
        ] {
            registry.register(Arc::new(Named(name, description))).unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn test_retrieve_all_when_k_exceeds_tools() {
        let embedder = Arc::new(HashEmbedder::new());
        let retriever = ToolRetriever::build(&registry(), embedder, DEFAULT_TOOL_TOP_K)
            .await
            .unwrap();

        let tools = retriever.retrieve("plot a line chart").await.unwrap();
        assert_eq!(tools.len(), 4);
        assert_eq!(tools[0].name(), "line");
    }

    #[tokio::test]
    async fn test_retrieve_limits_to_k() {
        let embedder = Arc::new(HashEmbedder::new());
        let retriever = ToolRetriever::build(&registry(), embedder, 2).await.unwrap();

        let tools = retriever.retrieve("report text").await.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name(), "textdata");
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let embedder = Arc::new(HashEmbedder::new());
        let retriever = ToolRetriever::build(&ToolRegistry::new(), embedder.clone(), 5)
            .await
            .unwrap();

        assert!(retriever.retrieve("anything").await.unwrap().is_empty());
        assert_eq!(embedder.batch_calls(), 0);
    }
}
