//! Deterministic text-to-diagram rendering.
//!
//! Splits a flow description on arrows or the connector words "to"/"then"
//! and renders one labeled box per segment, left to right, joined by arrows.
//! Pure function, no I/O.

use regex::Regex;
use std::sync::LazyLock;

/// Box geometry. Overall width is `segments * (BOX_W + GAP) + MARGIN`.
const BOX_W: usize = 120;
const BOX_H: usize = 40;
const GAP: usize = 40;
const MARGIN: usize = 20;
const HEIGHT: usize = 100;
const BOX_Y: usize = 30;

/// Label shown when the flow description is empty.
const PLACEHOLDER_LABEL: &str = "IT Support Flow";

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:->|→|\bto\b|\bthen\b)\s*").expect("separator regex"));

/// Render a flow description as an SVG string.
pub fn generate_diagram(spec: &str) -> String {
    let mut segments: Vec<String> = SEPARATORS
        .split(spec)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        segments.push(PLACEHOLDER_LABEL.to_string());
    }

    let width = segments.len() * (BOX_W + GAP) + MARGIN;
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = width,
        h = HEIGHT
    );
    svg.push_str(
        "<defs><marker id=\"arrow\" markerWidth=\"8\" markerHeight=\"8\" refX=\"6\" refY=\"3\" \
         orient=\"auto\"><path d=\"M0,0 L6,3 L0,6 z\" fill=\"#444\"/></marker></defs>",
    );

    for (i, segment) in segments.iter().enumerate() {
        let x = MARGIN + i * (BOX_W + GAP);
        svg.push_str(&format!(
            "<rect x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" rx=\"6\" \
             fill=\"#f2f6fa\" stroke=\"#446\"/>",
            x = x,
            y = BOX_Y,
            w = BOX_W,
            h = BOX_H
        ));
        svg.push_str(&format!(
            "<text x=\"{x}\" y=\"{y}\" text-anchor=\"middle\" font-family=\"sans-serif\" \
             font-size=\"12\" fill=\"#223\">{label}</text>",
            x = x + BOX_W / 2,
            y = BOX_Y + BOX_H / 2 + 4,
            label = escape_xml(&shorten_label(segment))
        ));
        if i + 1 < segments.len() {
            let x1 = x + BOX_W;
            let x2 = x + BOX_W + GAP - 6;
            svg.push_str(&format!(
                "<line x1=\"{x1}\" y1=\"{y}\" x2=\"{x2}\" y2=\"{y}\" stroke=\"#444\" \
                 stroke-width=\"2\" marker-end=\"url(#arrow)\"/>",
                x1 = x1,
                x2 = x2,
                y = BOX_Y + BOX_H / 2
            ));
        }
    }

    svg.push_str("</svg>");
    svg
}

/// Labels longer than 15 characters are cut to 12 plus an ellipsis.
fn shorten_label(label: &str) -> String {
    if label.chars().count() > 15 {
        let mut short: String = label.chars().take(12).collect();
        short.push('…');
        short
    } else {
        label.to_string()
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_segment_flow() {
        let svg = generate_diagram("A -> B -> C");
        assert_eq!(svg.matches("<rect").count(), 3);
        assert_eq!(svg.matches("<line").count(), 2);
        assert!(svg.contains("width=\"500\""));
        assert!(svg.contains("height=\"100\""));
    }

    #[test]
    fn test_empty_spec_renders_placeholder() {
        let svg = generate_diagram("");
        assert_eq!(svg.matches("<rect").count(), 1);
        assert_eq!(svg.matches("<line").count(), 0);
        assert!(svg.contains("IT Support Flow"));
        assert!(svg.contains("width=\"180\""));
    }

    #[test]
    fn test_word_separators() {
        let svg = generate_diagram("unplug router then wait then plug back in");
        assert_eq!(svg.matches("<rect").count(), 3);
    }

    #[test]
    fn test_to_inside_words_is_not_a_separator() {
        let svg = generate_diagram("monitor -> laptop");
        assert_eq!(svg.matches("<rect").count(), 2);
        assert!(svg.contains("monitor"));
    }

    #[test]
    fn test_unicode_arrow_separator() {
        let svg = generate_diagram("open settings → reset network");
        assert_eq!(svg.matches("<rect").count(), 2);
    }

    #[test]
    fn test_long_labels_are_shortened() {
        let svg = generate_diagram("a very long segment label indeed -> B");
        assert!(svg.contains("a very long …") || svg.contains("a very long…"));
    }

    #[test]
    fn test_labels_are_xml_escaped() {
        let svg = generate_diagram("cables & power -> B");
        assert!(svg.contains("cables &amp; power"));
    }

    #[test]
    fn test_output_is_valid_diagram_markup() {
        let svg = generate_diagram("A -> B");
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
    }
}
