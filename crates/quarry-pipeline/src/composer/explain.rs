//! Deterministic explanation text.

use quarry_core::models::ConstraintSet;

const MAX_QUOTE_CHARS: usize = 120;

/// "Computed from Orders and Order Details for 1997-12-01 to 1997-12-31."
pub fn computed(tables: &[&str], constraints: &ConstraintSet, repairs: usize) -> String {
    let source = match tables {
        [] => "the dataset".to_string(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    };
    let mut text = format!("Computed from {source}{}.", filters(constraints));
    if repairs > 0 {
        let noun = if repairs == 1 { "repair" } else { "repairs" };
        text.push_str(&format!(" The query succeeded after {repairs} {noun}."));
    }
    text
}

pub fn empty_result(constraints: &ConstraintSet) -> String {
    format!(
        "The query returned no usable rows{}; the answer is the default value.",
        filters(constraints)
    )
}

pub fn exhausted(repairs: usize, reason: &str) -> String {
    format!(
        "No data available: the query still failed after {repairs} repairs ({}).",
        quote(reason)
    )
}

pub fn unavailable(collaborator: &str, reason: &str) -> String {
    format!("The {collaborator} was unavailable ({}).", quote(reason))
}

pub fn found_in(fragment_id: &str, line: &str) -> String {
    format!("Found in {fragment_id}: \"{}\".", quote(line))
}

pub fn unsupported() -> String {
    "The language model answered, but no retrieved passage states that value.".to_string()
}

pub fn not_found(retrieved: bool) -> String {
    if retrieved {
        "No retrieved passage answers the question; the answer is the default value.".to_string()
    } else {
        "No document fragment matched the question; the answer is the default value.".to_string()
    }
}

fn filters(constraints: &ConstraintSet) -> String {
    let mut parts = Vec::new();
    match (constraints.date_start(), constraints.date_end()) {
        (Some(s), Some(e)) => parts.push(format!(" for {} to {}", s.format("%Y-%m-%d"), e.format("%Y-%m-%d"))),
        (Some(s), None) => parts.push(format!(" from {}", s.format("%Y-%m-%d"))),
        (None, Some(e)) => parts.push(format!(" through {}", e.format("%Y-%m-%d"))),
        (None, None) => {}
    }
    if let Some(category) = constraints.category() {
        parts.push(format!(" in category {category}"));
    }
    parts.concat()
}

/// Shorten and strip characters that would end a sentence early.
fn quote(text: &str) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = single_line.trim_end_matches(['.', '!', '?']);
    let mut out: String = trimmed
        .chars()
        .map(|c| if matches!(c, '.' | '!' | '?') { ',' } else { c })
        .take(MAX_QUOTE_CHARS)
        .collect();
    if trimmed.chars().count() > MAX_QUOTE_CHARS {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use quarry_core::models::{bound_explanation, ConstraintKey, ConstraintSource, ConstraintValue};

    #[test]
    fn computed_names_tables_and_filters() {
        let mut c = ConstraintSet::new();
        let d = |s| ConstraintValue::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap());
        c.insert(ConstraintKey::DateStart, d("1997-12-01"), ConstraintSource::Question);
        c.insert(ConstraintKey::DateEnd, d("1997-12-31"), ConstraintSource::Question);
        assert_eq!(
            computed(&["Orders", "Order Details"], &c, 1),
            "Computed from Orders and Order Details for 1997-12-01 to 1997-12-31. \
             The query succeeded after 1 repair."
        );
    }

    #[test]
    fn quoted_reasons_stay_within_two_sentences() {
        let text = exhausted(2, "near \"Details\": syntax error. Also this. And that!");
        assert_eq!(bound_explanation(&text), text);
    }
}
