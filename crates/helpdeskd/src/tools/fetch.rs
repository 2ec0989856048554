//! Page fetch tool.
//!
//! Fetches a URL, extracts clean text and the top-level headings for the
//! model to reason over. Never raises: any failure comes back as a
//! placeholder body explaining what went wrong.

use crate::config::FetchConfig;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Clean text is cut at this many characters, ellipsis included.
pub const CLEAN_TEXT_MAX: usize = 40_000;
/// At most this many headings are reported.
pub const HEADINGS_MAX: usize = 20;

/// Extracted page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub clean_text: String,
    pub headings: Vec<String>,
}

/// Page fetch client.
pub struct FetchClient {
    http: reqwest::Client,
}

impl FetchClient {
    pub fn new(config: &FetchConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("helpdeskd/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { http }
    }

    /// Fetch and extract a page. Failures degrade to a placeholder.
    pub async fn fetch_page(&self, url: &str) -> PageContent {
        match self.fetch_html(url).await {
            Ok(html) => extract_content(&html),
            Err(e) => {
                warn!("page fetch failed for {}: {:#}", url, e);
                PageContent {
                    clean_text: format!("[page fetch failed for {}: upstream unavailable]", url),
                    headings: vec![],
                }
            }
        }
    }

    async fn fetch_html(&self, url: &str) -> anyhow::Result<String> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }
        let html = response.text().await?;
        debug!("fetched {} ({} bytes)", url, html.len());
        Ok(html)
    }
}

/// Pull headings and clean text out of an HTML document.
fn extract_content(html: &str) -> PageContent {
    let document = Html::parse_document(html);

    let mut headings = Vec::new();
    if let Ok(selector) = Selector::parse("h1, h2") {
        for element in document.select(&selector) {
            let text: String = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                headings.push(text);
            }
            if headings.len() == HEADINGS_MAX {
                break;
            }
        }
    }

    let text = html2text::from_read(html.as_bytes(), 100);
    let cleaned: String = text
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    PageContent {
        clean_text: truncate_with_ellipsis(cleaned, CLEAN_TEXT_MAX),
        headings,
    }
}

fn truncate_with_ellipsis(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    let mut cut: String = text.chars().take(max - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_headings_and_text() {
        let html = "<html><body><h1>Printer setup</h1><p>Plug it in.</p>\
                    <h2>Troubleshooting</h2><p>Restart the spooler.</p></body></html>";
        let content = extract_content(html);
        assert_eq!(content.headings, vec!["Printer setup", "Troubleshooting"]);
        assert!(content.clean_text.contains("Plug it in"));
        assert!(content.clean_text.contains("spooler"));
    }

    #[test]
    fn test_headings_are_capped_at_twenty() {
        let mut html = String::from("<html><body>");
        for i in 0..30 {
            html.push_str(&format!("<h2>Section {}</h2>", i));
        }
        html.push_str("</body></html>");
        let content = extract_content(&html);
        assert_eq!(content.headings.len(), HEADINGS_MAX);
    }

    #[test]
    fn test_clean_text_is_ellipsis_truncated() {
        let body = "word ".repeat(20_000);
        let html = format!("<html><body><p>{}</p></body></html>", body);
        let content = extract_content(&html);
        assert!(content.clean_text.chars().count() <= CLEAN_TEXT_MAX);
        assert!(content.clean_text.ends_with('…'));
    }

    #[test]
    fn test_empty_document_yields_empty_content() {
        let content = extract_content("<html><body></body></html>");
        assert!(content.headings.is_empty());
        assert!(content.clean_text.is_empty());
    }
}
