//! Application context for chartqa.
//!
//! Opens the document indexes, wraps them in query tools next to the chart
//! tools, and wires everything into one agent and inquiry handler.

use crate::agent::Agent;
use crate::chart::ChartRenderer;
use crate::config::Settings;
use crate::document::Chunker;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{ChartQaError, Result};
use crate::index::{DocumentIndexStore, QueryEngine, VectorIndex};
use crate::inquiry::InquiryHandler;
use crate::llm::{ChatModel, OpenAIChatModel};
use crate::openai::create_client_with_timeout;
use crate::tools::{ChartTool, QueryEngineTool, ToolRegistry, ToolRetriever};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Everything needed to answer questions, built once per process.
pub struct Orchestrator {
    engines: Vec<Arc<QueryEngine>>,
    registry: Arc<ToolRegistry>,
    agent: Arc<Agent>,
    inquiry: Arc<InquiryHandler>,
}

impl Orchestrator {
    /// Create an orchestrator backed by OpenAI.
    pub async fn new(settings: Settings) -> Result<Self> {
        Self::open(settings, false).await
    }

    /// Like [`Orchestrator::new`], optionally rebuilding every index.
    pub async fn open(settings: Settings, rebuild: bool) -> Result<Self> {
        let client =
            create_client_with_timeout(Duration::from_secs(settings.llm.request_timeout_secs))?;

        let embedder: Arc<dyn Embedder> =
            Arc::new(OpenAIEmbedder::new(client.clone(), &settings.embedding));
        let chat: Arc<dyn ChatModel> = Arc::new(OpenAIChatModel::new(client, &settings.llm));

        Self::with_components(settings, embedder, chat, rebuild).await
    }

    /// Create an orchestrator with custom components.
    #[instrument(skip_all)]
    pub async fn with_components(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        rebuild: bool,
    ) -> Result<Self> {
        let indexes = open_indexes(&settings, embedder.clone(), rebuild).await?;

        let mut engines = Vec::with_capacity(indexes.len());
        let mut registry = ToolRegistry::new();
        for (index, index_settings) in indexes.into_iter().zip(&settings.indexes) {
            let engine = Arc::new(
                QueryEngine::new(
                    Arc::new(index),
                    embedder.clone(),
                    chat.clone(),
                    index_settings.similarity_top_k,
                )
                .with_prompt(&settings.prompts.query_synthesis),
            );
            registry.register(Arc::new(QueryEngineTool::new(
                &index_settings.name,
                &index_settings.description,
                engine.clone(),
            )))?;
            engines.push(engine);
        }

        let output_dir = settings.output_dir();
        registry.register(Arc::new(ChartTool::bar(ChartRenderer::new(&output_dir))))?;
        registry.register(Arc::new(ChartTool::line(ChartRenderer::new(&output_dir))))?;
        let registry = Arc::new(registry);
        info!("Registered tools: {}", registry.names().join(", "));

        let retriever =
            ToolRetriever::build(&registry, embedder.clone(), settings.llm.tool_top_k).await?;

        let agent = Arc::new(
            Agent::new(chat.clone(), registry.clone())
                .with_retriever(Arc::new(retriever))
                .with_system_prompt(&settings.prompts.agent_system)
                .with_max_iterations(settings.llm.max_iterations)
                .with_verbose(settings.llm.verbose)
                .with_parallel_tool_calls(settings.llm.allow_parallel_tool_calls),
        );
        let inquiry = Arc::new(InquiryHandler::new(agent.clone(), output_dir));

        Ok(Self {
            engines,
            registry,
            agent,
            inquiry,
        })
    }

    /// Query engine of the named index.
    pub fn query_engine(&self, name: &str) -> Option<Arc<QueryEngine>> {
        self.engines
            .iter()
            .find(|e| e.index().name == name)
            .cloned()
    }

    pub fn registry(&self) -> Arc<ToolRegistry> {
        self.registry.clone()
    }

    pub fn agent(&self) -> Arc<Agent> {
        self.agent.clone()
    }

    pub fn inquiry_handler(&self) -> Arc<InquiryHandler> {
        self.inquiry.clone()
    }
}

/// Open or build every configured index, in configuration order.
///
/// With `rebuild`, each index is rebuilt from its source files even when a
/// valid persisted copy exists.
pub async fn open_indexes(
    settings: &Settings,
    embedder: Arc<dyn Embedder>,
    rebuild: bool,
) -> Result<Vec<VectorIndex>> {
    let store = DocumentIndexStore::new(embedder, Chunker::from_settings(&settings.chunking)?);

    let mut indexes = Vec::with_capacity(settings.indexes.len());
    for index_settings in &settings.indexes {
        let persist_dir = index_settings.persist_path();
        let sources = index_settings.source_paths();

        let index = if rebuild {
            if sources.is_empty() {
                return Err(ChartQaError::Config(format!(
                    "cannot rebuild {}: no source files configured",
                    index_settings.name
                )));
            }
            store
                .rebuild(&index_settings.name, &persist_dir, &sources)
                .await?
        } else {
            store
                .open_or_build(&index_settings.name, &persist_dir, &sources)
                .await?
        };
        indexes.push(index);
    }
    Ok(indexes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexSettings;
    use crate::testing::{answer, tool_calls, HashEmbedder, ScriptedChatModel};
    use serde_json::json;
    use std::path::Path;

    fn settings(root: &Path) -> Settings {
        let text = root.join("report.txt");
        let chart = root.join("chart.txt");
        std::fs::write(&text, "Inflation slowed through the year as energy prices fell.").unwrap();
        std::fs::write(&chart, "Monthly CPI: Jan 100, Feb 105, Mar 103.").unwrap();

        let mut settings = Settings::default();
        settings.general.output_dir = root.join("temp_img").display().to_string();
        settings.llm.verbose = false;
        for (index, source) in settings.indexes.iter_mut().zip([&text, &chart]) {
            index.persist_dir = root.join(&index.name).display().to_string();
            index.source_files = vec![source.display().to_string()];
        }
        settings
    }

    #[tokio::test]
    async fn test_registry_order() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::with_components(
            settings(dir.path()),
            Arc::new(HashEmbedder::new()),
            Arc::new(ScriptedChatModel::new(Vec::new())),
            false,
        )
        .await
        .unwrap();

        assert_eq!(
            orchestrator.registry().names(),
            vec![
                "textdata",
                "chartdata",
                "vega_bar_chart_creator",
                "vega_line_chart_creator"
            ]
        );
        assert!(orchestrator.query_engine("chartdata").is_some());
        assert!(orchestrator.query_engine("missing").is_none());
        assert!(dir.path().join("textdata").join("index.db").exists());
    }

    #[tokio::test]
    async fn test_reopen_without_sources() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());
        let embedder = Arc::new(HashEmbedder::new());

        let first = open_indexes(&settings, embedder.clone(), false).await.unwrap();
        for index in &mut settings.indexes {
            index.source_files.clear();
        }
        let second = open_indexes(&settings, embedder.clone(), false).await.unwrap();
        assert_eq!(first, second);

        assert!(matches!(
            open_indexes(&settings, embedder, true).await,
            Err(ChartQaError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_index_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.indexes.push(IndexSettings {
            name: "vega_bar_chart_creator".to_string(),
            ..settings.indexes[0].clone()
        });

        let result = Orchestrator::with_components(
            settings,
            Arc::new(HashEmbedder::new()),
            Arc::new(ScriptedChatModel::new(Vec::new())),
            false,
        )
        .await;
        assert!(matches!(result, Err(ChartQaError::Config(_))));
    }

    #[tokio::test]
    async fn test_inquiry_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let chat = ScriptedChatModel::new(vec![
            tool_calls(&[("q1", "chartdata", json!({"input": "Monthly CPI values"}))]),
            // consumed by the chartdata query engine
            answer("Jan 100, Feb 105, Mar 103"),
            tool_calls(&[(
                "c1",
                "vega_line_chart_creator",
                json!({"data": {"Jan": 100, "Feb": 105, "Mar": 103}, "title": "Inflation"}),
            )]),
            answer("I charted monthly CPI."),
        ])
        .with_delay(std::time::Duration::from_millis(50));

        let orchestrator = Orchestrator::with_components(
            settings(dir.path()),
            Arc::new(HashEmbedder::new()),
            Arc::new(chat),
            false,
        )
        .await
        .unwrap();

        let outcome = orchestrator
            .inquiry_handler()
            .inquire("Plot monthly CPI as a line chart")
            .await
            .unwrap();

        assert_eq!(outcome.answer, "I charted monthly CPI.");
        assert_eq!(outcome.tool_calls[0].result, "Jan 100, Feb 105, Mar 103");
        let chart = outcome.latest_chart().unwrap();
        assert!(chart.starts_with(dir.path().join("temp_img")));
        assert_eq!(outcome.scanned.as_deref(), Some(chart));
    }
}
