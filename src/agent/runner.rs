//! Agent runner with tool calling loop.

use crate::config::Prompts;
use crate::error::{ChartQaError, Result};
use crate::llm::{ChatModel, ChatRequest};
use crate::tools::{Tool, ToolRegistry, ToolRetriever};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Agent that answers questions by calling document query and chart tools.
pub struct Agent {
    chat: Arc<dyn ChatModel>,
    registry: Arc<ToolRegistry>,
    retriever: Option<Arc<ToolRetriever>>,
    system_prompt: String,
    max_iterations: usize,
    verbose: bool,
    parallel_tool_calls: bool,
}

impl Agent {
    /// Create an agent offering every registered tool on each turn.
    pub fn new(chat: Arc<dyn ChatModel>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            chat,
            registry,
            retriever: None,
            system_prompt: Prompts::default().agent_system,
            max_iterations: 10,
            verbose: false,
            parallel_tool_calls: true,
        }
    }

    /// Offer only the tools the retriever ranks highest for the question.
    pub fn with_retriever(mut self, retriever: Arc<ToolRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Print tool calls and their outputs to stderr.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_parallel_tool_calls(mut self, allow: bool) -> Self {
        self.parallel_tool_calls = allow;
        self
    }

    /// Tools offered to the model for `question`.
    pub async fn select_tools(&self, question: &str) -> Result<Vec<Arc<dyn Tool>>> {
        match &self.retriever {
            Some(retriever) => retriever.retrieve(question).await,
            None => Ok(self.registry.tools().to_vec()),
        }
    }

    /// Run the agent on a user question.
    pub async fn chat(&self, question: &str) -> Result<AgentResponse> {
        let tools: Vec<_> = self
            .select_tools(question)
            .await?
            .iter()
            .map(|t| t.descriptor().to_openai())
            .collect();

        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.system_prompt.clone())
                .build()
                .map_err(|e| ChartQaError::Agent(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(question.to_string())
                .build()
                .map_err(|e| ChartQaError::Agent(e.to_string()))?
                .into(),
        ];

        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(ChartQaError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    self.max_iterations
                )));
            }

            debug!("Agent iteration {}", iterations);

            let turn = self
                .chat
                .complete(ChatRequest {
                    messages: messages.clone(),
                    tools: tools.clone(),
                    parallel_tool_calls: self.parallel_tool_calls,
                })
                .await?;

            if turn.tool_calls.is_empty() {
                return Ok(AgentResponse {
                    content: turn.content.unwrap_or_default(),
                    tool_calls: tool_calls_made,
                    iterations,
                });
            }

            // Add assistant message with tool calls to history
            let mut assistant = ChatCompletionRequestAssistantMessageArgs::default();
            assistant.tool_calls(turn.tool_calls.clone());
            if let Some(content) = turn.content.filter(|c| !c.is_empty()) {
                assistant.content(content);
            }
            messages.push(
                assistant
                    .build()
                    .map_err(|e| ChartQaError::Agent(e.to_string()))?
                    .into(),
            );

            // Calls requested together still run one after another
            for tool_call in &turn.tool_calls {
                let record = self.execute_tool_call(tool_call).await;

                let tool_msg = ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(&tool_call.id)
                    .content(record.result.clone())
                    .build()
                    .map_err(|e| ChartQaError::Agent(e.to_string()))?;
                messages.push(tool_msg.into());

                tool_calls_made.push(record);
            }
        }
    }

    /// Execute a single tool call and return a record of it.
    async fn execute_tool_call(&self, tool_call: &ChatCompletionMessageToolCall) -> ToolCallRecord {
        let name = &tool_call.function.name;
        let arguments = &tool_call.function.arguments;

        info!("Agent calling tool: {} with args: {}", name, arguments);
        if self.verbose {
            eprintln!("{}", style("=== Calling Function ===").magenta().bold());
            eprintln!("Calling function: {} with args: {}", name, arguments);
        }

        let record = match self.registry.call(name, arguments).await {
            Ok(output) => ToolCallRecord {
                name: name.clone(),
                arguments: arguments.clone(),
                result: output.content,
                is_error: false,
                artifact: output.artifact,
            },
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                ToolCallRecord {
                    name: name.clone(),
                    arguments: arguments.clone(),
                    result: format!("Error: {}", e),
                    is_error: true,
                    artifact: None,
                }
            }
        };

        if self.verbose {
            eprintln!("{}", style("=== Function Output ===").magenta().bold());
            eprintln!("{}", record.result);
        }

        record
    }
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final response content from the agent.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
}

impl AgentResponse {
    /// Files produced by tool calls, in call order.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.tool_calls
            .iter()
            .filter_map(|r| r.artifact.clone())
            .collect()
    }
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned to the model.
    pub result: String,
    pub is_error: bool,
    /// File written by the tool, if any.
    pub artifact: Option<PathBuf>,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
