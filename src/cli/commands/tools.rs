//! Tools command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the tools command.
pub async fn run_tools(question: Option<&str>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::OpenAI) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings).await?;

    match question {
        Some(question) => {
            let tools = orchestrator.agent().select_tools(question).await?;
            Output::header(&format!("Tools for \"{}\"", question));
            for tool in tools {
                Output::tool(tool.name(), tool.description());
            }
        }
        None => {
            let registry = orchestrator.registry();
            Output::header(&format!("Tools ({})", registry.len()));
            for tool in registry.tools() {
                Output::tool(tool.name(), tool.description());
            }
        }
    }

    Ok(())
}
