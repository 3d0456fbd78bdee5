//! Configuration settings for chartqa.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::Prompts;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub indexes: Vec<IndexSettings>,
    pub prompts: Prompts,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            chunking: ChunkingSettings::default(),
            indexes: IndexSettings::defaults(),
            prompts: Prompts::default(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory chart files are written to.
    pub output_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "temp_img".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

impl GeneralSettings {
    /// Log level for `-v` repeated `verbose` times; none means `log_level`.
    pub fn effective_log_level(&self, verbose: u8) -> &str {
        match verbose {
            0 => &self.log_level,
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Chat model and agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Chat completion model used by the agent and the query engines.
    pub model: String,
    pub temperature: f32,
    /// HTTP timeout for OpenAI requests, in seconds.
    pub request_timeout_secs: u64,
    /// Maximum model turns per inquiry.
    pub max_iterations: usize,
    /// Print every tool call and its output to stderr.
    pub verbose: bool,
    /// Let the model request several tools in one turn.
    pub allow_parallel_tool_calls: bool,
    /// Number of tools retrieved from the tool index per question.
    pub tool_top_k: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.1,
            request_timeout_secs: crate::openai::DEFAULT_TIMEOUT_SECS,
            max_iterations: 10,
            verbose: true,
            allow_parallel_tool_calls: true,
            tool_top_k: 5,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Texts per embeddings request.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: 100,
        }
    }
}

/// Document chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Words per chunk.
    pub chunk_words: usize,
    /// Words shared between consecutive chunks.
    pub overlap_words: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_words: 400,
            overlap_words: 50,
        }
    }
}

/// One document index and the query tool that wraps it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Index name, also used as the query tool name.
    pub name: String,
    /// Directory holding the persisted index.
    pub persist_dir: String,
    /// Source documents the index is built from.
    #[serde(default)]
    pub source_files: Vec<String>,
    /// Tool description shown to the agent.
    pub description: String,
    /// Nodes retrieved per query.
    #[serde(default = "default_similarity_top_k")]
    pub similarity_top_k: usize,
}

fn default_similarity_top_k() -> usize {
    3
}

impl IndexSettings {
    /// The text and chart-data indexes over the inflation report.
    pub fn defaults() -> Vec<Self> {
        vec![
            IndexSettings {
                name: "textdata".to_string(),
                persist_dir: "./test_files/textdata".to_string(),
                source_files: vec!["./test_files/inflation2024_report.pdf".to_string()],
                description: "Provides information about text in the document. \
                    Use a detailed plain text question as input to the tool."
                    .to_string(),
                similarity_top_k: default_similarity_top_k(),
            },
            IndexSettings {
                name: "chartdata".to_string(),
                persist_dir: "./test_files/chartdata".to_string(),
                source_files: vec!["./test_files/inflation2024_data_chart.pdf".to_string()],
                description: "Provides information about chart data in the document. \
                    Use a detailed plain text question as input to the tool."
                    .to_string(),
                similarity_top_k: default_similarity_top_k(),
            },
        ]
    }

    /// Expanded persist directory.
    pub fn persist_path(&self) -> PathBuf {
        Settings::expand_path(&self.persist_dir)
    }

    /// Expanded source file paths.
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.source_files
            .iter()
            .map(|s| Settings::expand_path(s))
            .collect()
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ChartQaError;

        if self.chunking.chunk_words == 0 {
            return Err(ChartQaError::Config("chunking.chunk_words must be positive".to_string()));
        }
        if self.chunking.overlap_words >= self.chunking.chunk_words {
            return Err(ChartQaError::Config(format!(
                "chunking.overlap_words ({}) must be less than chunk_words ({})",
                self.chunking.overlap_words, self.chunking.chunk_words
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for index in &self.indexes {
            if !seen.insert(index.name.as_str()) {
                return Err(ChartQaError::Config(format!("duplicate index name: {}", index.name)));
            }
        }
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chartqa")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded chart output directory.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Look up an index by name.
    pub fn index(&self, name: &str) -> Option<&IndexSettings> {
        self.indexes.iter().find(|i| i.name == name)
    }
}
