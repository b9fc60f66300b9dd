//! Deterministic answer extraction from ranked fragments.

use quarry_core::models::{FormatHint, RankedFragment, RankedFragmentSet};
use quarry_retrieval::tokenizer::distinct_terms;
use serde_json::Value;

use super::shape;

/// Question terms a line must share before it can answer.
const MIN_LINE_OVERLAP: usize = 2;

/// A value read from one line of one fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<'a> {
    pub value: Value,
    pub fragment: &'a RankedFragment,
    pub line: String,
}

/// Best-overlap line across the ranked fragments that yields a value for
/// `hint`. Ties go to the earlier fragment, then the earlier line.
/// Structured hints are not extracted from prose.
pub fn best_line<'a>(
    question: &str,
    hint: &FormatHint,
    fragments: &'a RankedFragmentSet,
) -> Option<Extracted<'a>> {
    let field = hint.scalar_type()?;
    let terms = distinct_terms(question);
    let mut best: Option<(usize, Extracted<'a>)> = None;

    for ranked in fragments.iter() {
        for line in ranked.fragment.text.lines() {
            let overlap = distinct_terms(line).intersection(&terms).count();
            if overlap < MIN_LINE_OVERLAP || best.as_ref().is_some_and(|(b, _)| overlap <= *b) {
                continue;
            }
            let text = clean_line(line);
            let value = match hint {
                FormatHint::Text => Some(Value::String(text.clone())),
                _ => shape::first_number(&text).and_then(|n| field.coerce(&Value::String(n.to_string()))),
            };
            if let Some(value) = value {
                best = Some((
                    overlap,
                    Extracted {
                        value,
                        fragment: ranked,
                        line: text,
                    },
                ));
            }
        }
    }
    best.map(|(_, e)| e)
}

fn clean_line(line: &str) -> String {
    line.trim()
        .trim_start_matches(['-', '*', '#'])
        .trim()
        .to_string()
}
