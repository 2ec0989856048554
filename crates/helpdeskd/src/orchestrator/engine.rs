//! The answer engine.
//!
//! Drives one conversation with the model:
//! draft -> tool dispatch (bounded rounds) -> finalize -> optional citation
//! repair. Every exit from a non-terminal state is guarded by the round
//! ceiling or a validation gate; citation diversity alone is best-effort.

use super::json_extract::{extract_array, extract_payload, parse_lenient};
use super::llm_client::{tool_specs, ChatMessage, LlmClient};
use super::prompts::{
    citation_repair_prompt, render_request, CITATION_REPAIR_SYSTEM_PROMPT, SYSTEM_PROMPT,
};
use crate::tools::{execute_all, failure_marker, ToolCall, ToolExecutor, ToolOutcome, ToolRequest};
use helpdesk_common::{
    has_distinct_sources, validate, Answer, RawAnswer, RawCitation, SchemaError, ValidRequest,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Tool-call rounds allowed before the conversation must produce an answer.
pub const MAX_TOOL_ROUNDS: usize = 3;

/// Successful engine result.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    Answer(Answer),
    /// The model needs one question answered before it can help.
    Clarification(String),
}

/// Terminal failure reasons. All of these surface to the caller as a
/// generic error; the detail is for logs only.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("tool-call budget exhausted")]
    BudgetExhausted,
    #[error("no valid structured response from the model")]
    NoStructuredResponse,
    #[error("answer failed schema validation")]
    SchemaMismatch(#[source] SchemaError),
    #[error("language model call failed: {0}")]
    LlmFailure(String),
}

/// Orchestrates model rounds and tool dispatch into a validated answer.
pub struct AnswerEngine {
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolExecutor>,
}

impl AnswerEngine {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<dyn ToolExecutor>) -> Self {
        Self { llm, tools }
    }

    /// Run the full conversation for one request.
    pub async fn answer(
        &self,
        request: &ValidRequest,
    ) -> Result<EngineOutcome, OrchestrationError> {
        let specs = tool_specs();
        let mut messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(render_request(request)),
        ];
        let mut rounds = 0usize;

        let final_text = loop {
            let reply = self
                .llm
                .chat(&messages, Some(&specs))
                .await
                .map_err(|e| OrchestrationError::LlmFailure(format!("{:#}", e)))?;

            if reply.tool_calls.is_empty() {
                break reply.content;
            }

            let requested = reply.tool_calls.clone();
            messages.push(reply);
            info!("model requested {} tool call(s)", requested.len());

            let mut resolved = Vec::new();
            let mut outcomes: Vec<ToolOutcome> = Vec::new();
            for call in &requested {
                let id = call
                    .id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                match ToolCall::from_invocation(&call.function.name, &call.function.arguments_value())
                {
                    Ok(tool_call) => resolved.push(ToolRequest { id, call: tool_call }),
                    Err(reason) => {
                        warn!("unresolvable tool call {}: {}", call.function.name, reason);
                        outcomes.push(failure_marker(&id, &call.function.name, &reason));
                    }
                }
            }
            outcomes.extend(execute_all(Arc::clone(&self.tools), resolved).await);

            for outcome in outcomes {
                let id = outcome.id.clone();
                let body = json!({
                    "id": outcome.id,
                    "tool": outcome.tool,
                    "result": outcome.payload,
                });
                messages.push(ChatMessage::tool_result(id, body.to_string()));
            }

            rounds += 1;
            if rounds >= MAX_TOOL_ROUNDS {
                warn!("no direct answer after {} tool rounds", rounds);
                return Err(OrchestrationError::BudgetExhausted);
            }
        };

        match self.finalize(&final_text)? {
            EngineOutcome::Answer(answer) => {
                Ok(EngineOutcome::Answer(self.repair_citations(answer).await))
            }
            clarification => Ok(clarification),
        }
    }

    /// Extract, parse, clamp and validate the model's final text.
    fn finalize(&self, text: &str) -> Result<EngineOutcome, OrchestrationError> {
        let payload =
            extract_payload(text).ok_or(OrchestrationError::NoStructuredResponse)?;
        let value =
            parse_lenient(&payload).map_err(|_| OrchestrationError::NoStructuredResponse)?;

        if let Some(question) = value
            .get("clarifying_question")
            .and_then(|q| q.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
        {
            return Ok(EngineOutcome::Clarification(question.to_string()));
        }

        let mut raw: RawAnswer = serde_json::from_value(value).map_err(|e| {
            OrchestrationError::SchemaMismatch(SchemaError {
                path: "$".to_string(),
                reason: e.to_string(),
            })
        })?;
        raw.clamp();
        let answer = validate(raw).map_err(OrchestrationError::SchemaMismatch)?;
        Ok(EngineOutcome::Answer(answer))
    }

    /// Best-effort citation-diversity repair. Keeps the original answer on
    /// any trouble; never escalates to a failure.
    async fn repair_citations(&self, answer: Answer) -> Answer {
        if has_distinct_sources(&answer.citations) {
            return answer;
        }
        info!("citations lack domain diversity, running repair round");

        let messages = [
            ChatMessage::system(CITATION_REPAIR_SYSTEM_PROMPT),
            ChatMessage::user(citation_repair_prompt(&answer.citations)),
        ];
        let reply = match self.llm.chat(&messages, None).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("citation repair call failed, keeping original: {:#}", e);
                return answer;
            }
        };

        let Some(payload) = extract_array(&reply.content) else {
            warn!("citation repair reply had no array, keeping original");
            return answer;
        };
        let Ok(value) = parse_lenient(&payload) else {
            warn!("citation repair reply did not parse, keeping original");
            return answer;
        };
        let Ok(fresh) = serde_json::from_value::<Vec<RawCitation>>(value) else {
            warn!("citation repair reply had wrong shape, keeping original");
            return answer;
        };

        // First 2 originals, then up to 3 new, capped at 5. Diversity of the
        // spliced list is intentionally not re-checked.
        let mut raw = RawAnswer::from(&answer);
        let spliced: Vec<RawCitation> = raw
            .citations
            .iter()
            .take(2)
            .cloned()
            .chain(fresh.into_iter().take(3))
            .take(5)
            .collect();
        raw.citations = spliced;
        raw.clamp();
        match validate(raw) {
            Ok(repaired) => repaired,
            Err(e) => {
                warn!("spliced citations failed validation, keeping original: {}", e);
                answer
            }
        }
    }
}
