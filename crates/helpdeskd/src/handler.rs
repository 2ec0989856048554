//! The request pipeline: admission -> validation -> cache -> orchestration.
//!
//! Transport-agnostic on purpose; the axum routes are a thin shell over
//! [`process_ask`] so the whole pipeline is exercisable in tests without a
//! listening socket. Exactly one telemetry record per terminal outcome.

use crate::orchestrator::{EngineOutcome, OrchestrationError};
use crate::server::AppState;
use crate::telemetry::RequestOutcome;
use helpdesk_common::{Answer, AskRequest};
use std::time::Instant;
use tracing::{error, info};

/// Identity used when the caller's network address is unavailable.
pub const ANONYMOUS_IDENTITY: &str = "anonymous";

/// Terminal pipeline results, one variant per response shape.
#[derive(Debug, Clone, PartialEq)]
pub enum AskReply {
    Answer {
        answer: Answer,
        cache_hit: bool,
        remaining: f64,
    },
    Clarification {
        question: String,
        remaining: f64,
    },
    RateLimited {
        retry_after_secs: u64,
    },
    InvalidInput {
        fields: Vec<String>,
    },
    /// Extraction failed, the budget ran out, or the model was unreachable.
    Unanswerable,
    /// The model's payload failed the answer contract.
    SchemaRejected,
}

/// Run one request through the pipeline.
pub async fn process_ask(state: &AppState, identity: &str, payload: AskRequest) -> AskReply {
    let start = Instant::now();

    if !state.limiter.consume(identity) {
        let retry_after_secs = state.limiter.retry_after_secs(identity);
        state
            .recorder
            .record(identity, RequestOutcome::RateLimited, start.elapsed());
        return AskReply::RateLimited { retry_after_secs };
    }

    let request = match payload.validate() {
        Ok(request) => request,
        Err(fields) => {
            state
                .recorder
                .record(identity, RequestOutcome::InvalidInput, start.elapsed());
            return AskReply::InvalidInput {
                fields: fields.iter().map(|f| f.to_string()).collect(),
            };
        }
    };

    let fingerprint = request.fingerprint();
    if let Some(answer) = state.cache.get(&fingerprint).await {
        info!("cache hit for {}", state.recorder.hash_identity(identity));
        state
            .recorder
            .record(identity, RequestOutcome::CacheHit, start.elapsed());
        return AskReply::Answer {
            answer,
            cache_hit: true,
            remaining: state.limiter.remaining(identity),
        };
    }

    match state.engine.answer(&request).await {
        Ok(EngineOutcome::Answer(answer)) => {
            state.cache.set(&fingerprint, answer.clone()).await;
            state
                .recorder
                .record(identity, RequestOutcome::Answered, start.elapsed());
            AskReply::Answer {
                answer,
                cache_hit: false,
                remaining: state.limiter.remaining(identity),
            }
        }
        Ok(EngineOutcome::Clarification(question)) => {
            state
                .recorder
                .record(identity, RequestOutcome::Clarification, start.elapsed());
            AskReply::Clarification {
                question,
                remaining: state.limiter.remaining(identity),
            }
        }
        Err(e) => {
            // Detail stays in the logs; the caller gets a generic shape.
            error!("orchestration failed: {:?}", e);
            let outcome = match &e {
                OrchestrationError::SchemaMismatch(_) => RequestOutcome::SchemaFailed,
                OrchestrationError::NoStructuredResponse => RequestOutcome::ExtractionFailed,
                OrchestrationError::BudgetExhausted | OrchestrationError::LlmFailure(_) => {
                    RequestOutcome::OrchestrationFailed
                }
            };
            state.recorder.record(identity, outcome, start.elapsed());
            match e {
                OrchestrationError::SchemaMismatch(_) => AskReply::SchemaRejected,
                _ => AskReply::Unanswerable,
            }
        }
    }
}
