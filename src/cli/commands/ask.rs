//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, model: Option<String>, mut settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::OpenAI) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.llm.model = model;
    }
    let verbose = settings.llm.verbose;

    let orchestrator = Orchestrator::new(settings).await?;
    let handler = orchestrator.inquiry_handler();

    // Verbose tool tracing writes to stderr; a spinner would garble it
    let spinner = (!verbose).then(|| Output::spinner("Thinking..."));

    let result = handler.inquire(question).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match result {
        Ok(outcome) => {
            println!("\n{}\n", outcome.answer);

            if !outcome.tool_calls.is_empty() {
                Output::header(&format!("Tool calls ({})", outcome.tool_calls.len()));
                for call in &outcome.tool_calls {
                    Output::tool_call(&call.name, &call.arguments, call.is_error);
                }
                println!();
            }

            match outcome.latest_chart() {
                Some(path) => Output::success(&format!("Chart: {}", path.display())),
                None => Output::info("No chart produced"),
            }
            Output::info(&format!("Completed in {} iteration(s)", outcome.iterations));
        }
        Err(e) => {
            Output::error(&format!("Inquiry failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
