//! Chat client for the language model backend.
//!
//! Speaks the Ollama chat API: role-tagged messages, declared tools, and
//! assistant turns that may carry tool-call requests instead of text. The
//! [`LlmClient`] trait is the seam tests script against.

use crate::tools::{DIAGRAM_TOOL, FETCH_TOOL, SEARCH_TOOL};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// One conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain("assistant", content)
    }

    /// Tool-result message, tagged with the originating request id.
    pub fn tool_result(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: Some(id.into()),
        }
    }

    fn plain(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }
}

/// Model-requested tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl FunctionCall {
    /// Arguments as a JSON object. Some backends send the arguments as an
    /// encoded string rather than an object; parse that case through.
    pub fn arguments_value(&self) -> Value {
        match &self.arguments {
            Value::String(s) => serde_json::from_str(s).unwrap_or(Value::Null),
            other => other.clone(),
        }
    }
}

/// Declared tool capability, in the chat API's function-tool shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The three declared capabilities, as sent to the model.
pub fn tool_specs() -> Vec<ToolSpec> {
    let spec = |name: &str, description: &str, parameters: Value| ToolSpec {
        kind: "function".to_string(),
        function: FunctionSpec {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        },
    };
    vec![
        spec(
            SEARCH_TOOL,
            "Search the web for support articles. Returns a list of {title, url, snippet}.",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "search query" },
                    "top_k": { "type": "integer", "description": "number of results, default 5" }
                },
                "required": ["query"]
            }),
        ),
        spec(
            FETCH_TOOL,
            "Fetch a web page and return its clean text and headings.",
            json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "absolute URL to fetch" }
                },
                "required": ["url"]
            }),
        ),
        spec(
            DIAGRAM_TOOL,
            "Render a left-to-right flow diagram as SVG from a description like 'A -> B -> C'.",
            json!({
                "type": "object",
                "properties": {
                    "spec": { "type": "string", "description": "flow description" }
                },
                "required": ["spec"]
            }),
        ),
    ]
}

/// Chat transport used by the orchestrator.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the conversation, optionally declaring tools, and return the
    /// assistant's next message.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
    ) -> Result<ChatMessage>;
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSpec]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

/// Ollama-backed chat client.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    keep_alive: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration, keep_alive: &str) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            keep_alive: keep_alive.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Quick reachability probe against the tags endpoint.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.http
            .get(&url)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
    ) -> Result<ChatMessage> {
        let url = format!("{}/api/chat", self.base_url);
        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            tools,
            keep_alive: Some(&self.keep_alive),
        };

        info!(
            "[>] LLM call [{}] ({} messages, tools: {})",
            self.model,
            messages.len(),
            tools.map(|t| t.len()).unwrap_or(0)
        );

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to the model backend")?;

        if !response.status().is_success() {
            anyhow::bail!("model backend returned {}", response.status());
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse model backend response")?;

        debug!(
            "[<] LLM response ({} chars, {} tool calls)",
            chat_response.message.content.len(),
            chat_response.message.tool_calls.len()
        );

        Ok(chat_response.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_specs_declare_all_three_capabilities() {
        let specs = tool_specs();
        let names: Vec<&str> = specs.iter().map(|s| s.function.name.as_str()).collect();
        assert_eq!(names, vec![SEARCH_TOOL, FETCH_TOOL, DIAGRAM_TOOL]);
        assert!(specs.iter().all(|s| s.kind == "function"));
    }

    #[test]
    fn test_arguments_value_parses_encoded_strings() {
        let call = FunctionCall {
            name: SEARCH_TOOL.to_string(),
            arguments: Value::String("{\"query\": \"wifi\"}".to_string()),
        };
        assert_eq!(call.arguments_value()["query"], "wifi");
    }

    #[test]
    fn test_arguments_value_passes_objects_through() {
        let call = FunctionCall {
            name: SEARCH_TOOL.to_string(),
            arguments: json!({ "query": "wifi" }),
        };
        assert_eq!(call.arguments_value()["query"], "wifi");
    }

    #[test]
    fn test_tool_result_carries_request_id() {
        let msg = ChatMessage::tool_result("call-7", "{}");
        assert_eq!(msg.role, "tool");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call-7"));
    }

    #[test]
    fn test_chat_message_serializes_without_empty_fields() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("tool_call_id"));
    }
}
