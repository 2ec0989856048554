//! Agent orchestration: model conversation, tool dispatch, validation.

pub mod engine;
pub mod json_extract;
pub mod llm_client;
pub mod prompts;

pub use engine::{AnswerEngine, EngineOutcome, OrchestrationError, MAX_TOOL_ROUNDS};
pub use llm_client::{
    tool_specs, ChatMessage, FunctionCall, LlmClient, OllamaClient, ToolCallRequest, ToolSpec,
};
