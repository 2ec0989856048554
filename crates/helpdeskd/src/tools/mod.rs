//! Tool capability surface for the orchestrator.
//!
//! The capability set is closed: search, page fetch, diagram generation.
//! Model-requested invocations are resolved by a match on the declared name,
//! executed with bounded concurrency, and every result — success or typed
//! failure marker — is joined before the next model turn.

pub mod diagram;
pub mod fetch;
pub mod search;

use crate::config::Config;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

pub use diagram::generate_diagram;
pub use fetch::{FetchClient, PageContent};
pub use search::{SearchClient, SearchHit, DEFAULT_TOP_K};

/// At most this many tool calls run at once within one model turn.
pub const MAX_TOOLS_IN_FLIGHT: usize = 4;

/// Declared tool names, as the model sees them.
pub const SEARCH_TOOL: &str = "web_search";
pub const FETCH_TOOL: &str = "fetch_page";
pub const DIAGRAM_TOOL: &str = "generate_diagram";

/// One resolved tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Search { query: String, top_k: usize },
    FetchPage { url: String },
    Diagram { spec: String },
}

impl ToolCall {
    /// Resolve a model-requested invocation to a capability. Unknown names
    /// or missing required arguments are errors the caller turns into a
    /// failure marker.
    pub fn from_invocation(name: &str, args: &Value) -> Result<Self, String> {
        match name {
            SEARCH_TOOL => {
                let query = args
                    .get("query")
                    .and_then(|q| q.as_str())
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .ok_or_else(|| "missing required argument 'query'".to_string())?;
                let top_k = args
                    .get("top_k")
                    .and_then(|k| k.as_u64())
                    .map(|k| k as usize)
                    .unwrap_or(DEFAULT_TOP_K);
                Ok(ToolCall::Search {
                    query: query.to_string(),
                    top_k,
                })
            }
            FETCH_TOOL => {
                let url = args
                    .get("url")
                    .and_then(|u| u.as_str())
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| "missing required argument 'url'".to_string())?;
                Ok(ToolCall::FetchPage {
                    url: url.to_string(),
                })
            }
            DIAGRAM_TOOL => {
                let spec = args.get("spec").and_then(|s| s.as_str()).unwrap_or("");
                Ok(ToolCall::Diagram {
                    spec: spec.to_string(),
                })
            }
            other => Err(format!("unknown tool '{}'", other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Search { .. } => SEARCH_TOOL,
            ToolCall::FetchPage { .. } => FETCH_TOOL,
            ToolCall::Diagram { .. } => DIAGRAM_TOOL,
        }
    }
}

/// A tool invocation carrying its correlation id through dispatch.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub id: String,
    pub call: ToolCall,
}

/// Result of one invocation, tagged with its request id so the model can
/// correlate multi-tool rounds regardless of completion order.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub id: String,
    pub tool: &'static str,
    pub payload: Value,
}

/// Executes resolved tool calls. The trait seam exists so tests can swap in
/// a scripted executor.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> anyhow::Result<Value>;
}

/// Production executor over the real clients.
pub struct Toolbox {
    search: SearchClient,
    fetch: FetchClient,
}

impl Toolbox {
    pub fn new(config: &Config) -> Self {
        Self {
            search: SearchClient::new(&config.search),
            fetch: FetchClient::new(&config.fetch),
        }
    }
}

#[async_trait]
impl ToolExecutor for Toolbox {
    async fn execute(&self, call: &ToolCall) -> anyhow::Result<Value> {
        match call {
            ToolCall::Search { query, top_k } => {
                let hits = self.search.search(query, *top_k).await;
                Ok(json!({ "results": hits }))
            }
            ToolCall::FetchPage { url } => {
                let page = self.fetch.fetch_page(url).await;
                Ok(json!(page))
            }
            ToolCall::Diagram { spec } => Ok(json!({ "svg": generate_diagram(spec) })),
        }
    }
}

/// Typed failure marker substituted for a failed invocation. Tool failures
/// never abort the round.
pub fn failure_marker(id: &str, tool: &str, message: &str) -> ToolOutcome {
    ToolOutcome {
        id: id.to_string(),
        tool: match tool {
            SEARCH_TOOL => SEARCH_TOOL,
            FETCH_TOOL => FETCH_TOOL,
            DIAGRAM_TOOL => DIAGRAM_TOOL,
            _ => "unknown",
        },
        payload: json!({
            "error": { "tool": tool, "message": message }
        }),
    }
}

/// Run a batch of invocations with at most [`MAX_TOOLS_IN_FLIGHT`] going at
/// once and collect every outcome before returning.
pub async fn execute_all(
    executor: Arc<dyn ToolExecutor>,
    requests: Vec<ToolRequest>,
) -> Vec<ToolOutcome> {
    let semaphore = Arc::new(Semaphore::new(MAX_TOOLS_IN_FLIGHT));
    let mut join_set = JoinSet::new();

    for request in requests {
        let executor = Arc::clone(&executor);
        let semaphore = Arc::clone(&semaphore);
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let tool = request.call.name();
            info!("executing tool {} ({})", tool, request.id);
            match executor.execute(&request.call).await {
                Ok(payload) => ToolOutcome {
                    id: request.id,
                    tool,
                    payload,
                },
                Err(e) => {
                    warn!("tool {} failed: {:#}", tool, e);
                    failure_marker(&request.id, tool, "tool execution failed")
                }
            }
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!("tool task did not complete: {}", e),
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_search_invocation() {
        let call = ToolCall::from_invocation(
            SEARCH_TOOL,
            &json!({ "query": "printer offline", "top_k": 3 }),
        )
        .unwrap();
        assert_eq!(
            call,
            ToolCall::Search {
                query: "printer offline".to_string(),
                top_k: 3
            }
        );
    }

    #[test]
    fn test_search_defaults_top_k() {
        let call = ToolCall::from_invocation(SEARCH_TOOL, &json!({ "query": "q" })).unwrap();
        assert_eq!(
            call,
            ToolCall::Search {
                query: "q".to_string(),
                top_k: DEFAULT_TOP_K
            }
        );
    }

    #[test]
    fn test_missing_query_is_an_error() {
        assert!(ToolCall::from_invocation(SEARCH_TOOL, &json!({})).is_err());
        assert!(ToolCall::from_invocation(FETCH_TOOL, &json!({ "url": " " })).is_err());
    }

    #[test]
    fn test_unknown_tool_is_an_error() {
        let err = ToolCall::from_invocation("format_disk", &json!({})).unwrap_err();
        assert!(err.contains("format_disk"));
    }

    #[test]
    fn test_diagram_spec_defaults_to_empty() {
        let call = ToolCall::from_invocation(DIAGRAM_TOOL, &json!({})).unwrap();
        assert_eq!(
            call,
            ToolCall::Diagram {
                spec: String::new()
            }
        );
    }

    #[test]
    fn test_failure_marker_names_the_tool() {
        let marker = failure_marker("id-1", FETCH_TOOL, "timed out");
        assert_eq!(marker.payload["error"]["tool"], FETCH_TOOL);
        assert_eq!(marker.id, "id-1");
    }

    struct CountingExecutor {
        running: std::sync::Mutex<usize>,
        peak: std::sync::Mutex<usize>,
    }

    #[async_trait]
    impl ToolExecutor for CountingExecutor {
        async fn execute(&self, _call: &ToolCall) -> anyhow::Result<Value> {
            {
                let mut running = self.running.lock().unwrap();
                *running += 1;
                let mut peak = self.peak.lock().unwrap();
                *peak = (*peak).max(*running);
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            *self.running.lock().unwrap() -= 1;
            Ok(json!({ "ok": true }))
        }
    }

    #[tokio::test]
    async fn test_execute_all_bounds_concurrency_and_joins_all() {
        let executor = Arc::new(CountingExecutor {
            running: std::sync::Mutex::new(0),
            peak: std::sync::Mutex::new(0),
        });
        let requests: Vec<ToolRequest> = (0..10)
            .map(|i| ToolRequest {
                id: format!("r{}", i),
                call: ToolCall::Diagram {
                    spec: String::new(),
                },
            })
            .collect();
        let outcomes = execute_all(executor.clone(), requests).await;
        assert_eq!(outcomes.len(), 10);
        assert!(*executor.peak.lock().unwrap() <= MAX_TOOLS_IN_FLIGHT);
    }

    struct FailingExecutor;

    #[async_trait]
    impl ToolExecutor for FailingExecutor {
        async fn execute(&self, _call: &ToolCall) -> anyhow::Result<Value> {
            anyhow::bail!("boom")
        }
    }

    #[tokio::test]
    async fn test_failures_become_markers_not_errors() {
        let outcomes = execute_all(
            Arc::new(FailingExecutor),
            vec![ToolRequest {
                id: "r0".to_string(),
                call: ToolCall::FetchPage {
                    url: "https://example.com".to_string(),
                },
            }],
        )
        .await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].payload["error"]["tool"], FETCH_TOOL);
    }
}
