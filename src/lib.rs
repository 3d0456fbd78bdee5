//! chartqa - Question answering over documents, with charts
//!
//! Answers questions about a report by letting a tool-calling agent query
//! vector indexes built from the report's PDFs and draw bar or line charts
//! as standalone Vega-Lite HTML files.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `document` - PDF/text loading and chunking
//! - `embedding` - Embedding generation
//! - `index` - Persisted vector indexes and query engines
//! - `chart` - Vega-Lite chart rendering
//! - `tools` - Tool registry and embedding-based tool selection
//! - `agent` - Tool-calling agent loop
//! - `artifact` - Locating freshly written chart files
//! - `inquiry` - One question in, the produced chart out
//! - `orchestrator` - Wiring everything together
//!
//! # Example
//!
//! ```rust,no_run
//! use chartqa::config::Settings;
//! use chartqa::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings).await?;
//!
//!     let chart = orchestrator
//!         .inquiry_handler()
//!         .handle("Plot monthly inflation for 2024 as a line chart")
//!         .await?;
//!     if let Some(path) = chart {
//!         println!("Chart written to {}", path.display());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod artifact;
pub mod chart;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod inquiry;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod tools;

#[cfg(test)]
mod testing;

pub use error::{ChartQaError, Result};
