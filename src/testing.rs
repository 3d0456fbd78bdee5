//! Deterministic stand-ins for the OpenAI-backed traits.

use crate::embedding::Embedder;
use crate::error::{ChartQaError, Result};
use crate::llm::{ChatModel, ChatRequest, ChatTurn};
use async_openai::types::{ChatCompletionMessageToolCall, ChatCompletionToolType, FunctionCall};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const HASH_DIMENSIONS: usize = 32;

/// Bag-of-words embedder: each lowercase word bumps one hashed bucket.
pub struct HashEmbedder {
    batch_calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            batch_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed_batch` calls so far.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; HASH_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf29ce484222325_u64, |h, b| {
                    (h ^ b as u64).wrapping_mul(0x100000001b3)
                });
            v[(hash % HASH_DIMENSIONS as u64) as usize] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model(&self) -> &str {
        "hash-test"
    }

    fn dimensions(&self) -> usize {
        HASH_DIMENSIONS
    }
}

/// Chat model that replays a fixed list of turns and records requests.
pub struct ScriptedChatModel {
    turns: Mutex<VecDeque<ChatTurn>>,
    requests: Mutex<Vec<ChatRequest>>,
    delay: Duration,
}

impl ScriptedChatModel {
    pub fn new(turns: Vec<ChatTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Sleep before every reply, so file timestamps move past "now".
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, request: ChatRequest) -> Result<ChatTurn> {
        self.requests.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ChartQaError::OpenAI("script exhausted".to_string()))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// A final answer turn.
pub fn answer(text: &str) -> ChatTurn {
    ChatTurn {
        content: Some(text.to_string()),
        tool_calls: Vec::new(),
    }
}

/// A turn requesting the given `(id, tool, arguments)` calls.
pub fn tool_calls(calls: &[(&str, &str, serde_json::Value)]) -> ChatTurn {
    ChatTurn {
        content: None,
        tool_calls: calls
            .iter()
            .map(|(id, name, args)| ChatCompletionMessageToolCall {
                id: id.to_string(),
                r#type: ChatCompletionToolType::Function,
                function: FunctionCall {
                    name: name.to_string(),
                    arguments: args.to_string(),
                },
            })
            .collect(),
    }
}
