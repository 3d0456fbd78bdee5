//! Query command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the query command.
pub async fn run_query(index: &str, question: &str, settings: Settings) -> Result<()> {
    if settings.index(index).is_none() {
        let names: Vec<_> = settings.indexes.iter().map(|i| i.name.as_str()).collect();
        anyhow::bail!("Unknown index '{}'. Configured: {}", index, names.join(", "));
    }

    if let Err(e) = preflight::check(Operation::OpenAI) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings).await?;
    let engine = orchestrator
        .query_engine(index)
        .ok_or_else(|| anyhow::anyhow!("Index '{}' was not opened", index))?;

    let spinner = Output::spinner("Querying index...");
    let result = engine.query(question).await;
    spinner.finish_and_clear();

    let response = result?;
    println!("\n{}\n", response.answer);

    if !response.sources.is_empty() {
        Output::header("Sources");
        for result in &response.sources {
            Output::source(&result.node.source, result.node.page, result.score, &result.node.content);
        }
    }

    Ok(())
}
