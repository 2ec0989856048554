//! Prompt templates for the answer engine.

use helpdesk_common::{Citation, ValidRequest};

/// System instructions for the main answer conversation.
pub const SYSTEM_PROMPT: &str = r#"You are an IT support specialist answering one end-user question.

You may call the declared tools (web_search, fetch_page, generate_diagram) to
ground your answer in real support articles. Prefer searching before answering
anything you are not certain about.

When you are ready, reply with ONE JSON object and nothing else:

{
  "answer_title": "short title (max 200 chars)",
  "one_paragraph_summary": "one paragraph (max 1000 chars)",
  "prereqs": ["optional prerequisite, max 300 chars each"],
  "steps": [
    {
      "title": "step title (max 150 chars)",
      "detail": "what to do (max 800 chars)",
      "os": ["Windows", "macOS", "Android", "iOS", "ChromeOS", "Linux"],
      "est_minutes": 5,
      "shell": ["optional command, max 200 chars each"]
    }
  ],
  "decision_tree": [
    { "if": "condition (max 200 chars)", "then": "action (max 300 chars)", "link_step": 1 }
  ],
  "diagrams": [
    { "caption": "what the diagram shows (max 200 chars)", "svg": "<svg ...>...</svg>" }
  ],
  "citations": [
    { "url": "https://...", "title": "source title", "quote": "short quote (max 180 chars)" }
  ],
  "warnings": ["optional caution, max 300 chars each"]
}

Rules:
- At least one step. Between 2 and 5 citations, from at least two different
  websites.
- Only include diagrams produced by the generate_diagram tool.
- If the operating system or device is essential and missing, ask at most one
  clarifying question by replying {"clarifying_question": "..."} instead of
  the answer object. Otherwise never ask questions.
"#;

/// System instructions for the citation-repair round.
pub const CITATION_REPAIR_SYSTEM_PROMPT: &str = r#"You supply replacement citations for an IT support answer.
Reply with ONE JSON array of citation objects and nothing else:
[{ "url": "https://...", "title": "source title", "quote": "short quote" }]"#;

/// Render the user's request as the opening user message.
pub fn render_request(request: &ValidRequest) -> String {
    format!(
        "Issue: {}\nOperating system: {}\nDevice: {}",
        request.issue, request.os, request.device
    )
}

/// Ask for 1-2 citations from domains not already represented.
pub fn citation_repair_prompt(citations: &[Citation]) -> String {
    let current = citations
        .iter()
        .map(|c| format!("- {} ({})", c.title, c.url))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "The citations below all come from the same website:\n{}\n\n\
         Provide 1-2 replacement citations for the same topic from different \
         websites, as a JSON array.",
        current
    )
}
