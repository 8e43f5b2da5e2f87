//! AI dialogue engine seam
//!
//! The orchestrator only sees [`DialogueSession`]; conversation history is
//! owned by the implementation.

pub mod gemini;

pub use gemini::GeminiSession;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Name of the single tool the engine may invoke
pub const SEARCH_FLIGHTS_TOOL: &str = "searchFlights";

/// A structured action requested by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    /// Untrusted arguments, validated before use
    #[serde(default)]
    pub args: Value,
}

/// One engine turn: plain text, a tool call, or both
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineReply {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub tool_call: Option<ToolCall>,
}

impl EngineReply {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_call: None,
        }
    }

    #[must_use]
    pub fn tool_call(name: impl Into<String>, args: Value) -> Self {
        Self {
            text: None,
            tool_call: Some(ToolCall {
                name: name.into(),
                args,
            }),
        }
    }
}

/// A stateful conversation with the AI engine
#[async_trait]
pub trait DialogueSession: Send + Sync {
    /// Send a user turn
    async fn send_turn(&self, text: &str) -> Result<EngineReply>;

    /// Return a tool's result into the same conversation. A tool call
    /// left unanswered is dropped from the history by the next `send_turn`.
    async fn send_tool_result(&self, name: &str, result: Value) -> Result<EngineReply>;
}
