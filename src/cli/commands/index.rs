//! Index command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::openai::create_client_with_timeout;
use crate::orchestrator::open_indexes;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Run the index command.
pub async fn run_index(rebuild: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::OpenAI) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let client =
        create_client_with_timeout(Duration::from_secs(settings.llm.request_timeout_secs))?;
    let embedder: Arc<dyn Embedder> =
        Arc::new(OpenAIEmbedder::new(client, &settings.embedding));

    let spinner = Output::spinner(if rebuild {
        "Rebuilding indexes..."
    } else {
        "Opening indexes..."
    });
    let result = open_indexes(&settings, embedder, rebuild).await;
    spinner.finish_and_clear();

    let indexes = match result {
        Ok(indexes) => indexes,
        Err(e) => {
            Output::error(&format!("Failed to open indexes: {}", e));
            return Err(e.into());
        }
    };

    Output::header("Indexes");
    for (index, index_settings) in indexes.iter().zip(&settings.indexes) {
        Output::list_item(&format!("{} ({} nodes)", index.name, index.len()));
        Output::kv("persist_dir", &index_settings.persist_path().display().to_string());
        Output::kv("embedding", &format!("{} ({})", index.embedding_model, index.dimensions));
    }

    Ok(())
}
