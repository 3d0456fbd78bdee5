//! Tool-calling agent.
//!
//! The agent answers a question by letting the chat model call the query
//! tools over the indexed documents and the chart tools, feeding each tool
//! result back until the model produces a final reply.

mod runner;

pub use runner::{Agent, AgentResponse, ToolCallRecord};
