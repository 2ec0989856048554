//! Test doubles for the orchestration and pipeline test suites.
//!
//! `FakeLlmClient` replays a scripted sequence of assistant messages;
//! `FakeToolExecutor` returns a canned payload and records every call.
//! No network or shell involved.

use crate::orchestrator::{ChatMessage, FunctionCall, LlmClient, ToolCallRequest, ToolSpec};
use crate::tools::{ToolCall, ToolExecutor};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scripted LLM client. Replies are consumed in order; running out of
/// script is an error, as a real conversation should never do that.
pub struct FakeLlmClient {
    replies: Mutex<VecDeque<ChatMessage>>,
    /// Full conversation snapshots, one per `chat` call.
    pub transcripts: Mutex<Vec<Vec<ChatMessage>>>,
    /// Whether tools were declared on each call.
    pub tools_declared: Mutex<Vec<bool>>,
    pub calls: AtomicUsize,
}

impl FakeLlmClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            transcripts: Mutex::new(Vec::new()),
            tools_declared: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue a plain text reply.
    pub fn push_text(self, text: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(ChatMessage::assistant(text));
        self
    }

    /// Queue a reply that requests tool calls instead of answering.
    pub fn push_tool_calls(self, calls: Vec<(&str, Value)>) -> Self {
        let tool_calls = calls
            .into_iter()
            .enumerate()
            .map(|(i, (name, arguments))| ToolCallRequest {
                id: Some(format!("call-{}", i)),
                function: FunctionCall {
                    name: name.to_string(),
                    arguments,
                },
            })
            .collect();
        self.replies.lock().unwrap().push_back(ChatMessage {
            role: "assistant".to_string(),
            content: String::new(),
            tool_calls,
            tool_call_id: None,
        });
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FakeLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
    ) -> anyhow::Result<ChatMessage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.transcripts.lock().unwrap().push(messages.to_vec());
        self.tools_declared.lock().unwrap().push(tools.is_some());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("fake LLM script exhausted"))
    }
}

/// Canned tool executor recording every resolved call.
pub struct FakeToolExecutor {
    pub calls: Mutex<Vec<ToolCall>>,
    result: Value,
    fail: bool,
}

impl FakeToolExecutor {
    pub fn returning(result: Value) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            result,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            result: Value::Null,
            fail: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ToolExecutor for FakeToolExecutor {
    async fn execute(&self, call: &ToolCall) -> anyhow::Result<Value> {
        self.calls.lock().unwrap().push(call.clone());
        if self.fail {
            anyhow::bail!("scripted tool failure");
        }
        Ok(self.result.clone())
    }
}
