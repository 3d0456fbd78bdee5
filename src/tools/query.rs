//! Query engine tools.

use super::{Tool, ToolOutput};
use crate::error::{ChartQaError, Result};
use crate::index::QueryEngine;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Exposes a [`QueryEngine`] to the agent under a name and description.
pub struct QueryEngineTool {
    name: String,
    description: String,
    engine: Arc<QueryEngine>,
}

impl QueryEngineTool {
    pub fn new(name: &str, description: &str, engine: Arc<QueryEngine>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            engine,
        }
    }
}

#[async_trait]
impl Tool for QueryEngineTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "A detailed plain text question"
                }
            },
            "required": ["input"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let input = args["input"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ChartQaError::Tool("Missing 'input' argument".to_string()))?;

        let response = self.engine.query(input).await?;
        Ok(ToolOutput::text(response.answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Node, VectorIndex};
    use crate::testing::{answer, HashEmbedder, ScriptedChatModel};
    use uuid::Uuid;

    fn engine(chat: Arc<ScriptedChatModel>) -> Arc<QueryEngine> {
        let index = VectorIndex {
            name: "textdata".to_string(),
            embedding_model: "hash-test".to_string(),
            dimensions: 32,
            nodes: vec![Node {
                id: Uuid::new_v4(),
                source: "report.pdf".to_string(),
                page: 2,
                chunk_order: 0,
                content: "Inflation slowed".to_string(),
                embedding: vec![1.0; 32],
            }],
        };
        Arc::new(QueryEngine::new(
            Arc::new(index),
            Arc::new(HashEmbedder::new()),
            chat,
            3,
        ))
    }

    #[tokio::test]
    async fn test_query_tool_returns_answer() {
        let chat = Arc::new(ScriptedChatModel::new(vec![answer("It slowed.")]));
        let tool = QueryEngineTool::new("textdata", "Report text", engine(chat));

        let output = tool.call(json!({"input": "What did inflation do?"})).await.unwrap();
        assert_eq!(output, ToolOutput::text("It slowed."));
    }

    #[tokio::test]
    async fn test_query_tool_requires_input() {
        let chat = Arc::new(ScriptedChatModel::new(Vec::new()));
        let tool = QueryEngineTool::new("textdata", "Report text", engine(chat));

        assert!(matches!(
            tool.call(json!({"question": "x"})).await,
            Err(ChartQaError::Tool(_))
        ));
    }
}
