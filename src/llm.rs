//! Chat model abstraction used by the agent and the query engines.

use crate::config::LlmSettings;
use crate::error::{ChartQaError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestMessage, ChatCompletionTool,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// One request to the chat model.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatCompletionRequestMessage>,
    /// Tools offered for this turn. Empty means plain completion.
    pub tools: Vec<ChatCompletionTool>,
    /// Allow several tool calls in a single reply.
    pub parallel_tool_calls: bool,
}

/// The assistant's reply to a [`ChatRequest`].
#[derive(Debug, Clone, Default)]
pub struct ChatTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ChatCompletionMessageToolCall>,
}

/// Trait for chat completion backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion turn.
    async fn complete(&self, request: ChatRequest) -> Result<ChatTurn>;

    /// Model identifier.
    fn model(&self) -> &str;
}

/// OpenAI chat completions.
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    pub fn new(client: Client<OpenAIConfig>, settings: &LlmSettings) -> Self {
        Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip(self, request), fields(model = %self.model, tools = request.tools.len()))]
    async fn complete(&self, request: ChatRequest) -> Result<ChatTurn> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(request.messages)
            .temperature(self.temperature);

        // The API rejects parallel_tool_calls without tools
        if !request.tools.is_empty() {
            args.tools(request.tools)
                .parallel_tool_calls(request.parallel_tool_calls);
        }

        let request = args
            .build()
            .map_err(|e| ChartQaError::Agent(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ChartQaError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChartQaError::Agent("No response from model".to_string()))?;

        let turn = ChatTurn {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
        };
        debug!("Model replied with {} tool call(s)", turn.tool_calls.len());
        Ok(turn)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
