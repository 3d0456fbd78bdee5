//! One user question in, the chart it produced (if any) out.

use crate::agent::{Agent, ToolCallRecord};
use crate::artifact::find_latest_after;
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// Everything an inquiry produced.
#[derive(Debug)]
pub struct InquiryOutcome {
    /// The agent's final reply.
    pub answer: String,
    /// Chart files reported by chart tool calls, in call order.
    pub charts: Vec<PathBuf>,
    /// Newest file in the output directory written during the inquiry.
    pub scanned: Option<PathBuf>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub iterations: usize,
}

impl InquiryOutcome {
    /// The chart to show: the last one a tool reported, else the scan result.
    pub fn latest_chart(&self) -> Option<&Path> {
        self.charts.last().or(self.scanned.as_ref()).map(PathBuf::as_path)
    }
}

/// Runs questions through the agent and finds the charts they produce.
pub struct InquiryHandler {
    agent: Arc<Agent>,
    output_dir: PathBuf,
    lock: Mutex<()>,
}

impl InquiryHandler {
    pub fn new(agent: Arc<Agent>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            agent,
            output_dir: output_dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Answer `question` and return the newest chart written while doing so.
    ///
    /// The reply is printed; only the chart path is returned.
    pub async fn handle(&self, question: &str) -> Result<Option<PathBuf>> {
        let outcome = self.inquire(question).await?;
        println!("{}", outcome.answer);
        Ok(outcome.scanned)
    }

    /// Answer `question`, reporting the reply, tool calls and charts.
    #[instrument(skip(self))]
    pub async fn inquire(&self, question: &str) -> Result<InquiryOutcome> {
        // One inquiry at a time so the directory scan is attributable
        let _guard = self.lock.lock().await;

        let since = SystemTime::now();
        let response = self.agent.chat(question).await?;
        info!(
            "Agent replied after {} iteration(s): {}",
            response.iterations, response.content
        );

        let charts = response.artifacts();
        let scanned = find_latest_after(&self.output_dir, since)?;

        Ok(InquiryOutcome {
            answer: response.content,
            charts,
            scanned,
            tool_calls: response.tool_calls,
            iterations: response.iterations,
        })
    }
}
