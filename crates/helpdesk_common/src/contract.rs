//! The structured answer contract.
//!
//! The language model is asked for JSON in this shape; the raw form is what
//! we accept at the trust boundary, the typed form is what leaves the
//! orchestrator after clamping and validation. Clamping truncates over-length
//! text to its contractual bound so verbose model output is repaired rather
//! than rejected; count bounds (citations, steps) stay validation's job.

use crate::os::Os;
use serde::{Deserialize, Serialize};

/// Maximum length of the answer title, in characters.
pub const TITLE_MAX: usize = 200;
/// Maximum length of the one-paragraph summary.
pub const SUMMARY_MAX: usize = 1000;
/// Maximum length of a single prerequisite entry.
pub const PREREQ_MAX: usize = 300;
/// Maximum length of a step title.
pub const STEP_TITLE_MAX: usize = 150;
/// Maximum length of a step detail.
pub const STEP_DETAIL_MAX: usize = 800;
/// Maximum length of a single shell command line.
pub const SHELL_MAX: usize = 200;
/// Maximum length of a decision-tree condition.
pub const DECISION_IF_MAX: usize = 200;
/// Maximum length of a decision-tree action.
pub const DECISION_THEN_MAX: usize = 300;
/// Maximum length of a diagram caption.
pub const DIAGRAM_CAPTION_MAX: usize = 200;
/// Maximum length of inline diagram markup.
pub const DIAGRAM_SVG_MAX: usize = 10_000;
/// Maximum length of a citation title.
pub const CITATION_TITLE_MAX: usize = 200;
/// Maximum length of a citation quote.
pub const CITATION_QUOTE_MAX: usize = 180;
/// Maximum length of a warning entry.
pub const WARNING_MAX: usize = 300;
/// Minimum number of citations a valid answer carries.
pub const CITATIONS_MIN: usize = 2;
/// Maximum number of citations a valid answer carries.
pub const CITATIONS_MAX: usize = 5;

/// Validated answer, as stored in the cache and sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer_title: String,
    pub one_paragraph_summary: String,
    pub prereqs: Vec<String>,
    pub steps: Vec<Step>,
    pub decision_tree: Vec<DecisionNode>,
    pub diagrams: Vec<Diagram>,
    pub citations: Vec<Citation>,
    pub warnings: Vec<String>,
}

/// One ordered troubleshooting step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub title: String,
    pub detail: String,
    pub os: Vec<Os>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub est_minutes: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shell: Vec<String>,
}

/// One branch of the decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionNode {
    #[serde(rename = "if")]
    pub condition: String,
    #[serde(rename = "then")]
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_step: Option<u32>,
}

/// Inline SVG diagram with caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub caption: String,
    pub svg: String,
}

/// Source citation backing the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub quote: String,
}

/// Untrusted answer candidate, straight out of the model's JSON.
///
/// Every field defaults so a missing key surfaces as an empty value and is
/// reported by validation with its path, instead of failing the whole parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAnswer {
    #[serde(default)]
    pub answer_title: String,
    #[serde(default)]
    pub one_paragraph_summary: String,
    #[serde(default)]
    pub prereqs: Vec<String>,
    #[serde(default)]
    pub steps: Vec<RawStep>,
    #[serde(default)]
    pub decision_tree: Vec<RawDecisionNode>,
    #[serde(default)]
    pub diagrams: Vec<RawDiagram>,
    #[serde(default)]
    pub citations: Vec<RawCitation>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStep {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub os: Vec<String>,
    #[serde(default)]
    pub est_minutes: Option<f64>,
    #[serde(default)]
    pub shell: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDecisionNode {
    #[serde(default, rename = "if")]
    pub condition: String,
    #[serde(default, rename = "then")]
    pub action: String,
    #[serde(default)]
    pub link_step: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDiagram {
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub svg: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCitation {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub quote: String,
}

impl RawAnswer {
    /// Truncate every over-length string to its contractual bound.
    ///
    /// Runs before validation so over-length content never causes rejection
    /// on its own. Counts are untouched here: a sixth citation must still
    /// fail validation rather than be silently dropped.
    pub fn clamp(&mut self) {
        truncate(&mut self.answer_title, TITLE_MAX);
        truncate(&mut self.one_paragraph_summary, SUMMARY_MAX);
        for p in &mut self.prereqs {
            truncate(p, PREREQ_MAX);
        }
        for step in &mut self.steps {
            truncate(&mut step.title, STEP_TITLE_MAX);
            truncate(&mut step.detail, STEP_DETAIL_MAX);
            for line in &mut step.shell {
                truncate(line, SHELL_MAX);
            }
        }
        for node in &mut self.decision_tree {
            truncate(&mut node.condition, DECISION_IF_MAX);
            truncate(&mut node.action, DECISION_THEN_MAX);
        }
        for diagram in &mut self.diagrams {
            truncate(&mut diagram.caption, DIAGRAM_CAPTION_MAX);
            truncate(&mut diagram.svg, DIAGRAM_SVG_MAX);
        }
        for citation in &mut self.citations {
            truncate(&mut citation.title, CITATION_TITLE_MAX);
            truncate(&mut citation.quote, CITATION_QUOTE_MAX);
        }
        for w in &mut self.warnings {
            truncate(w, WARNING_MAX);
        }
    }
}

impl From<&Answer> for RawAnswer {
    /// Back-convert a validated answer into candidate form, used when the
    /// citation-repair round re-runs clamp + validate on a spliced copy.
    fn from(answer: &Answer) -> Self {
        RawAnswer {
            answer_title: answer.answer_title.clone(),
            one_paragraph_summary: answer.one_paragraph_summary.clone(),
            prereqs: answer.prereqs.clone(),
            steps: answer
                .steps
                .iter()
                .map(|s| RawStep {
                    title: s.title.clone(),
                    detail: s.detail.clone(),
                    os: s.os.iter().map(|os| os.as_str().to_string()).collect(),
                    est_minutes: s.est_minutes,
                    shell: s.shell.clone(),
                })
                .collect(),
            decision_tree: answer
                .decision_tree
                .iter()
                .map(|n| RawDecisionNode {
                    condition: n.condition.clone(),
                    action: n.action.clone(),
                    link_step: n.link_step.map(i64::from),
                })
                .collect(),
            diagrams: answer
                .diagrams
                .iter()
                .map(|d| RawDiagram {
                    caption: d.caption.clone(),
                    svg: d.svg.clone(),
                })
                .collect(),
            citations: answer
                .citations
                .iter()
                .map(|c| RawCitation {
                    url: c.url.clone(),
                    title: c.title.clone(),
                    quote: c.quote.clone(),
                })
                .collect(),
            warnings: answer.warnings.clone(),
        }
    }
}

/// Truncate a string to `max` characters, in place.
fn truncate(s: &mut String, max: usize) {
    if s.chars().count() > max {
        *s = s.chars().take(max).collect();
    }
}
