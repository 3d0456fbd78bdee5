//! CLI module for chartqa.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand, ValueEnum};

/// chartqa - Ask questions about a report and get charts back
///
/// Answers questions over indexed PDF documents with a tool-calling agent
/// that can draw bar and line charts as standalone HTML files.
#[derive(Parser, Debug)]
#[command(name = "chartqa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question; the agent may query the documents and draw a chart
    Ask {
        /// The question to ask
        question: String,

        /// Chat model to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Render a chart directly from JSON data
    Chart {
        /// Chart kind
        #[arg(value_enum)]
        kind: ChartKindArg,

        /// Data as a JSON object ({"Jan": 100}) or list of [label, value] pairs
        #[arg(short, long)]
        data: String,

        /// Chart title
        #[arg(short, long)]
        title: Option<String>,

        /// X axis label
        #[arg(long)]
        x_label: Option<String>,

        /// Y axis label
        #[arg(long)]
        y_label: Option<String>,

        /// Mark color
        #[arg(long)]
        color: Option<String>,
    },

    /// Open or build every configured document index
    Index {
        /// Rebuild from source files even if a persisted index exists
        #[arg(long)]
        rebuild: bool,
    },

    /// Ask one document index directly, without the agent
    Query {
        /// Index name (e.g. textdata, chartdata)
        index: String,

        /// The question to ask
        question: String,
    },

    /// List the agent's tools, or the ones selected for a question
    Tools {
        /// Show only the tools retrieved for this question
        question: Option<String>,
    },

    /// Show the most recent chart in the output directory
    Latest {
        /// Only consider charts modified within this many seconds
        #[arg(long)]
        since_secs: Option<u64>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKindArg {
    Bar,
    Line,
}

impl From<ChartKindArg> for crate::chart::ChartKind {
    fn from(kind: ChartKindArg) -> Self {
        match kind {
            ChartKindArg::Bar => Self::Bar,
            ChartKindArg::Line => Self::Line,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chart_command() {
        let cli = Cli::try_parse_from([
            "chartqa",
            "chart",
            "line",
            "--data",
            r#"{"Jan": 100}"#,
            "--title",
            "Inflation",
        ])
        .unwrap();

        match cli.command {
            Commands::Chart { kind, data, title, .. } => {
                assert_eq!(kind, ChartKindArg::Line);
                assert_eq!(data, r#"{"Jan": 100}"#);
                assert_eq!(title.as_deref(), Some("Inflation"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from(["chartqa", "index", "--rebuild", "-vv", "-c", "cfg.toml"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some("cfg.toml"));
        assert!(matches!(cli.command, Commands::Index { rebuild: true }));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
