//! Answers and the batch output record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{MAX_EXPLANATION_CHARS, MAX_EXPLANATION_SENTENCES};

use super::FormatHint;

/// Typed, cited answer produced by the composer and checked by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub value: Value,
    pub confidence: f64,
    pub explanation: String,
    /// Fragment identifiers and table names, deduplicated, in first-use order.
    pub citations: Vec<String>,
    /// Cleared by the validator when the value had to be replaced.
    pub valid: bool,
}

impl Answer {
    pub fn new(value: Value, confidence: f64, explanation: &str, citations: Vec<String>) -> Self {
        Self {
            value,
            confidence,
            explanation: bound_explanation(explanation),
            citations: dedup_citations(citations),
            valid: true,
        }
    }

    /// Minimal answer for a question the pipeline could not serve:
    /// the hint's zero value, confidence 0, no citations.
    pub fn fallback(hint: &FormatHint, explanation: &str) -> Self {
        Self {
            value: hint.zero_value(),
            confidence: 0.0,
            explanation: bound_explanation(explanation),
            citations: Vec::new(),
            valid: false,
        }
    }
}

/// One stage record of a per-question trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub stage: String,
    pub summary: String,
    pub duration_ms: u64,
}

/// One line of the batch output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: String,
    pub final_answer: Value,
    /// Last executed query; empty when none ran.
    pub sql: String,
    pub confidence: f64,
    pub explanation: String,
    pub citations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceStep>>,
}

impl AnswerRecord {
    pub fn from_answer(id: &str, answer: Answer, sql: String, trace: Option<Vec<TraceStep>>) -> Self {
        Self {
            id: id.to_string(),
            final_answer: answer.value,
            sql,
            confidence: answer.confidence,
            explanation: answer.explanation,
            citations: answer.citations,
            trace,
        }
    }
}

/// Trim `text` to at most two sentences and the explanation character limit.
/// Whitespace runs collapse to single spaces.
pub fn bound_explanation(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut end = collapsed.len();
    let mut sentences = 0;
    let bytes = collapsed.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'!' | b'?') {
            let at_boundary = bytes.get(i + 1).map_or(true, |n| *n == b' ');
            // Decimal points are not sentence ends.
            let numeric = i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            if at_boundary && !numeric {
                sentences += 1;
                if sentences == MAX_EXPLANATION_SENTENCES {
                    end = i + 1;
                    break;
                }
            }
        }
    }
    let mut out = collapsed[..end].to_string();

    if out.chars().count() > MAX_EXPLANATION_CHARS {
        out = out.chars().take(MAX_EXPLANATION_CHARS - 3).collect::<String>();
        out = out.trim_end().to_string();
        out.push_str("...");
    }
    out
}

fn dedup_citations(citations: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(citations.len());
    for c in citations {
        if !c.is_empty() && !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn explanation_keeps_two_sentences() {
        let text = "Revenue is 12.50 per order. Filtered to 1997. Extra detail here.";
        assert_eq!(
            bound_explanation(text),
            "Revenue is 12.50 per order. Filtered to 1997."
        );
    }

    #[test]
    fn explanation_is_length_bounded() {
        let long = "word ".repeat(200);
        let out = bound_explanation(&long);
        assert!(out.chars().count() <= MAX_EXPLANATION_CHARS);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn citations_are_deduplicated_in_order() {
        let a = Answer::new(
            json!(1),
            0.9,
            "ok",
            vec!["Orders".into(), "kpi::chunk0".into(), "Orders".into(), String::new()],
        );
        assert_eq!(a.citations, vec!["Orders", "kpi::chunk0"]);
    }

    #[test]
    fn fallback_has_zero_value_and_no_citations() {
        let a = Answer::fallback(&FormatHint::parse("list[{product:str}]"), "timed out");
        assert_eq!(a.value, json!([]));
        assert_eq!(a.confidence, 0.0);
        assert!(a.citations.is_empty());
    }

    #[test]
    fn record_omits_absent_trace() {
        let a = Answer::new(json!(3), 0.7, "ok", vec!["Orders".into()]);
        let rec = AnswerRecord::from_answer("q1", a, "SELECT 3".into(), None);
        let line = serde_json::to_string(&rec).unwrap();
        assert!(!line.contains("trace"));
        assert!(line.contains("\"final_answer\":3"));
    }
}
