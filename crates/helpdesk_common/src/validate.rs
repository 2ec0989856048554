//! Schema validation for answer candidates.
//!
//! Runs after clamping; produces a typed [`Answer`] or a [`SchemaError`]
//! naming the offending path. Schema internals are logged by the daemon,
//! never sent to the caller.

use crate::contract::{
    Answer, Citation, DecisionNode, Diagram, RawAnswer, Step, CITATIONS_MAX, CITATIONS_MIN,
};
use crate::os::Os;
use std::collections::HashSet;
use url::Url;

/// A candidate answer failed the contract.
#[derive(Debug, Clone, thiserror::Error)]
#[error("schema violation at {path}: {reason}")]
pub struct SchemaError {
    /// JSON-path-ish location of the offending field.
    pub path: String,
    pub reason: String,
}

impl SchemaError {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Validate a clamped candidate against the contract.
pub fn validate(raw: RawAnswer) -> Result<Answer, SchemaError> {
    if raw.answer_title.trim().is_empty() {
        return Err(SchemaError::new("answer_title", "must not be empty"));
    }
    if raw.one_paragraph_summary.trim().is_empty() {
        return Err(SchemaError::new(
            "one_paragraph_summary",
            "must not be empty",
        ));
    }

    if raw.steps.is_empty() {
        return Err(SchemaError::new("steps", "at least one step is required"));
    }
    let mut steps = Vec::with_capacity(raw.steps.len());
    for (i, step) in raw.steps.into_iter().enumerate() {
        if step.title.trim().is_empty() {
            return Err(SchemaError::new(
                format!("steps[{}].title", i),
                "must not be empty",
            ));
        }
        if step.detail.trim().is_empty() {
            return Err(SchemaError::new(
                format!("steps[{}].detail", i),
                "must not be empty",
            ));
        }
        if step.os.is_empty() {
            return Err(SchemaError::new(
                format!("steps[{}].os", i),
                "at least one operating system is required",
            ));
        }
        let mut os = Vec::with_capacity(step.os.len());
        for (j, name) in step.os.iter().enumerate() {
            match name.parse::<Os>() {
                Ok(parsed) => os.push(parsed),
                Err(()) => {
                    return Err(SchemaError::new(
                        format!("steps[{}].os[{}]", i, j),
                        format!("unknown operating system '{}'", name),
                    ))
                }
            }
        }
        if let Some(minutes) = step.est_minutes {
            if !minutes.is_finite() || minutes <= 0.0 {
                return Err(SchemaError::new(
                    format!("steps[{}].est_minutes", i),
                    "must be a positive number",
                ));
            }
        }
        steps.push(Step {
            title: step.title,
            detail: step.detail,
            os,
            est_minutes: step.est_minutes,
            shell: step.shell,
        });
    }

    let mut decision_tree = Vec::with_capacity(raw.decision_tree.len());
    for (i, node) in raw.decision_tree.into_iter().enumerate() {
        if node.condition.trim().is_empty() {
            return Err(SchemaError::new(
                format!("decision_tree[{}].if", i),
                "must not be empty",
            ));
        }
        if node.action.trim().is_empty() {
            return Err(SchemaError::new(
                format!("decision_tree[{}].then", i),
                "must not be empty",
            ));
        }
        let link_step = match node.link_step {
            None => None,
            Some(n) if n >= 1 && n <= u32::MAX as i64 => Some(n as u32),
            Some(_) => {
                return Err(SchemaError::new(
                    format!("decision_tree[{}].link_step", i),
                    "must be a positive integer",
                ))
            }
        };
        decision_tree.push(DecisionNode {
            condition: node.condition,
            action: node.action,
            link_step,
        });
    }

    let mut diagrams = Vec::with_capacity(raw.diagrams.len());
    for (i, diagram) in raw.diagrams.into_iter().enumerate() {
        if diagram.caption.trim().is_empty() {
            return Err(SchemaError::new(
                format!("diagrams[{}].caption", i),
                "must not be empty",
            ));
        }
        if !diagram.svg.trim_start().starts_with("<svg") {
            return Err(SchemaError::new(
                format!("diagrams[{}].svg", i),
                "must begin with an opening <svg> tag",
            ));
        }
        diagrams.push(Diagram {
            caption: diagram.caption,
            svg: diagram.svg,
        });
    }

    if raw.citations.len() < CITATIONS_MIN || raw.citations.len() > CITATIONS_MAX {
        return Err(SchemaError::new(
            "citations",
            format!(
                "expected between {} and {} citations, got {}",
                CITATIONS_MIN,
                CITATIONS_MAX,
                raw.citations.len()
            ),
        ));
    }
    let mut citations = Vec::with_capacity(raw.citations.len());
    for (i, citation) in raw.citations.into_iter().enumerate() {
        if Url::parse(&citation.url).is_err() {
            return Err(SchemaError::new(
                format!("citations[{}].url", i),
                "malformed URL",
            ));
        }
        if citation.title.trim().is_empty() {
            return Err(SchemaError::new(
                format!("citations[{}].title", i),
                "must not be empty",
            ));
        }
        citations.push(Citation {
            url: citation.url,
            title: citation.title,
            quote: citation.quote,
        });
    }

    Ok(Answer {
        answer_title: raw.answer_title,
        one_paragraph_summary: raw.one_paragraph_summary,
        prereqs: raw.prereqs,
        steps,
        decision_tree,
        diagrams,
        citations,
        warnings: raw.warnings,
    })
}

/// Registrable domain of a URL: the last two dot-separated labels of the
/// hostname (`support.example.com` -> `example.com`). An unparseable URL or
/// one without a hostname yields `None`.
pub fn registrable_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.is_empty() {
        return None;
    }
    let start = labels.len().saturating_sub(2);
    Some(labels[start..].join(".").to_ascii_lowercase())
}

/// True when the citations span at least two distinct registrable domains.
pub fn has_distinct_sources(citations: &[Citation]) -> bool {
    if citations.len() < 2 {
        return false;
    }
    let domains: HashSet<String> = citations
        .iter()
        .filter_map(|c| registrable_domain(&c.url))
        .collect();
    domains.len() >= 2
}
