//! Web search tool.
//!
//! Thin client over a search API. Results go through a junk-URL filter
//! (documents, login and admin pages) unless the query itself asks for that
//! kind of content. Missing credentials or an upstream failure degrade to a
//! small deterministic placeholder set so the orchestrator always has
//! something to reason over.

use crate::config::SearchConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default number of results returned.
pub const DEFAULT_TOP_K: usize = 5;

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

static DOCUMENT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(pdf|docx?|pptx?|xlsx?)($|[?#])").expect("document url regex")
});

static AUTH_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/(login|log-in|signin|sign-in|signup|sign-up|admin|wp-admin|auth)(/|$|[?#])")
        .expect("auth url regex")
});

/// Search client with placeholder fallback.
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SearchClient {
    pub fn new(config: &SearchConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            warn!(
                "No search API key in ${}, search will serve placeholder results",
                config.api_key_env
            );
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key,
        }
    }

    /// Run a query, returning at most `top_k` filtered hits. Never fails:
    /// upstream trouble degrades to placeholders.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        let top_k = if top_k == 0 { DEFAULT_TOP_K } else { top_k };
        let Some(api_key) = &self.api_key else {
            return placeholder_results(query, top_k);
        };

        match self.search_upstream(query, top_k, api_key).await {
            Ok(hits) if !hits.is_empty() => filter_junk(hits, query, top_k),
            Ok(_) => {
                debug!("search returned no results for {:?}", query);
                placeholder_results(query, top_k)
            }
            Err(e) => {
                warn!("search upstream failed: {:#}", e);
                placeholder_results(query, top_k)
            }
        }
    }

    async fn search_upstream(
        &self,
        query: &str,
        top_k: usize,
        api_key: &str,
    ) -> anyhow::Result<Vec<SearchHit>> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("q", query), ("count", &top_k.to_string())])
            .header("X-Subscription-Token", api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("search API returned {}", response.status());
        }

        let body: Value = response.json().await?;
        let results = body
            .get("web")
            .and_then(|w| w.get("results"))
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(results
            .iter()
            .filter_map(|r| {
                let url = r.get("url").and_then(|u| u.as_str())?;
                Some(SearchHit {
                    title: r
                        .get("title")
                        .and_then(|t| t.as_str())
                        .unwrap_or("Untitled")
                        .to_string(),
                    url: url.to_string(),
                    snippet: r
                        .get("description")
                        .and_then(|d| d.as_str())
                        .unwrap_or("")
                        .to_string(),
                })
            })
            .collect())
    }
}

/// Drop document/login/admin URLs unless the query asks for them.
fn filter_junk(hits: Vec<SearchHit>, query: &str, top_k: usize) -> Vec<SearchHit> {
    let query_lower = query.to_lowercase();
    let wants_documents = ["pdf", "doc", "docx", "ppt", "document", "manual", "datasheet"]
        .iter()
        .any(|w| query_lower.contains(w));
    let wants_auth = ["login", "log in", "signin", "sign in", "admin", "password"]
        .iter()
        .any(|w| query_lower.contains(w));

    hits.into_iter()
        .filter(|hit| {
            if !wants_documents && DOCUMENT_URL.is_match(&hit.url) {
                return false;
            }
            if !wants_auth && AUTH_URL.is_match(&hit.url) {
                return false;
            }
            true
        })
        .take(top_k)
        .collect()
}

/// Deterministic fallback pointing at the big vendor support portals.
fn placeholder_results(query: &str, top_k: usize) -> Vec<SearchHit> {
    let portals = [
        ("Microsoft Support", "https://support.microsoft.com/search"),
        ("Apple Support", "https://support.apple.com/kb/index"),
        ("Google Support", "https://support.google.com/search"),
        ("Mozilla Support", "https://support.mozilla.org/search"),
        ("Arch Wiki", "https://wiki.archlinux.org/index.php"),
    ];
    portals
        .iter()
        .take(top_k)
        .map(|(name, base)| {
            let url = Url::parse_with_params(base, &[("q", query)])
                .map(String::from)
                .unwrap_or_else(|_| (*base).to_string());
            SearchHit {
                title: format!("{}: {}", name, query),
                url,
                snippet: format!("Search {} for \"{}\".", name, query),
            }
        })
        .collect()
}
