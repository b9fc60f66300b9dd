//! Coercion of query rows and model text into the declared shape.

use std::sync::LazyLock;

use quarry_core::models::{FormatHint, RowSet};
use regex::Regex;
use serde_json::Value;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\$?\d[\d,]*(?:\.\d+)?").expect("number regex is valid")
});

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```[a-z]*").expect("fence regex is valid"));

/// Shape a row set. `None` when the rows carry no usable value.
///
/// Lists keep dataset row order unless `rank_by` names a field, in which
/// case they are sorted descending on it (stable). `limit` truncates.
pub fn from_rows(
    hint: &FormatHint,
    rows: &RowSet,
    rank_by: Option<&str>,
    limit: Option<usize>,
) -> Option<Value> {
    if rows.is_empty() {
        return None;
    }
    match hint {
        FormatHint::Int | FormatHint::Float | FormatHint::Text => {
            let field = hint.scalar_type()?;
            rows.first_value().and_then(|v| field.coerce(v))
        }
        FormatHint::Object(fields) => {
            let record = rows.record(0)?;
            Some(FormatHint::shape_record(fields, &record))
        }
        FormatHint::List(fields) => {
            let mut items: Vec<Value> = rows
                .records()
                .map(|record| FormatHint::shape_record(fields, &record))
                .collect();
            if let Some(key) = rank_by.and_then(|r| ranking_key(&items, r)) {
                items.sort_by(|a, b| {
                    let x = a.get(&key).and_then(Value::as_f64).unwrap_or(f64::MIN);
                    let y = b.get(&key).and_then(Value::as_f64).unwrap_or(f64::MIN);
                    y.total_cmp(&x)
                });
            }
            if let Some(n) = limit {
                items.truncate(n);
            }
            Some(Value::Array(items))
        }
    }
}

/// Field of the shaped items that a rank-by constraint refers to.
fn ranking_key(items: &[Value], rank_by: &str) -> Option<String> {
    let first = items.first()?.as_object()?;
    let wanted = rank_by.to_ascii_lowercase();
    first
        .iter()
        .find(|(k, v)| v.is_number() && k.to_ascii_lowercase().contains(&wanted))
        .map(|(k, _)| k.clone())
}

/// Parse free model text into the declared shape.
///
/// Fences are stripped. Scalars take the first number (or the first line
/// for text); objects and lists take the first JSON value of that kind.
pub fn from_text(hint: &FormatHint, text: &str) -> Option<Value> {
    let cleaned = FENCE.replace_all(text, "");
    let cleaned = cleaned.trim();
    match hint {
        FormatHint::Int | FormatHint::Float => {
            let field = hint.scalar_type()?;
            let raw = NUMBER.find(cleaned)?.as_str();
            field.coerce(&Value::String(raw.to_string()))
        }
        FormatHint::Text => {
            let line = cleaned.lines().next()?.trim().trim_matches(['"', '\'']).trim();
            (!line.is_empty()).then(|| Value::String(line.to_string()))
        }
        FormatHint::Object(fields) => {
            let obj = first_json(cleaned, '{')?;
            let record: Vec<(String, Value)> = obj.as_object()?.clone().into_iter().collect();
            Some(FormatHint::shape_record(fields, &record))
        }
        FormatHint::List(fields) => {
            let arr = first_json(cleaned, '[')?;
            let items = arr
                .as_array()?
                .iter()
                .filter_map(Value::as_object)
                .map(|o| {
                    let record: Vec<(String, Value)> = o.clone().into_iter().collect();
                    FormatHint::shape_record(fields, &record)
                })
                .collect();
            Some(Value::Array(items))
        }
    }
}

/// First number in `text`, as it appears.
pub fn first_number(text: &str) -> Option<&str> {
    NUMBER.find(text).map(|m| m.as_str())
}

/// Every number in `text`. Currency signs and digit separators are
/// dropped; `1997-12-01` reads as 1997, -12 and -1.
pub fn numbers(text: &str) -> impl Iterator<Item = f64> + '_ {
    NUMBER
        .find_iter(text)
        .filter_map(|m| m.as_str().replace(['$', ','], "").parse::<f64>().ok())
}

/// First JSON value starting at an `open` character that parses.
fn first_json(text: &str, open: char) -> Option<Value> {
    text.match_indices(open).find_map(|(i, _)| {
        serde_json::Deserializer::from_str(&text[i..])
            .into_iter::<Value>()
            .next()
            .and_then(Result::ok)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> RowSet {
        RowSet::new(
            vec!["product".into(), "revenue".into()],
            vec![
                vec![json!("Chai"), json!(648.0)],
                vec![json!("Cote de Blaye"), json!(790.5)],
                vec![json!("Carnarvon Tigers"), json!(750.0)],
            ],
        )
    }

    #[test]
    fn list_keeps_row_order_without_ranking() {
        let hint = FormatHint::parse("list[{product:str, revenue:float}]");
        let v = from_rows(&hint, &rows(), None, None).unwrap();
        assert_eq!(v[0]["product"], "Chai");
        assert_eq!(v.as_array().unwrap().len(), 3);
    }

    #[test]
    fn list_sorts_on_rank_by_and_truncates() {
        let hint = FormatHint::parse("list[{product:str, revenue:float}]");
        let v = from_rows(&hint, &rows(), Some("revenue"), Some(2)).unwrap();
        assert_eq!(
            v,
            json!([
                {"product": "Cote de Blaye", "revenue": 790.5},
                {"product": "Carnarvon Tigers", "revenue": 750.0}
            ])
        );
    }

    #[test]
    fn scalar_takes_first_value() {
        let rs = RowSet::new(vec!["aov".into()], vec![vec![json!(642.0499999)]]);
        assert_eq!(from_rows(&FormatHint::Float, &rs, None, None), Some(json!(642.05)));
        let null = RowSet::new(vec!["aov".into()], vec![vec![Value::Null]]);
        assert_eq!(from_rows(&FormatHint::Float, &null, None, None), None);
    }

    #[test]
    fn object_aligns_columns_by_name() {
        let rs = RowSet::new(
            vec!["quantity".into(), "category".into()],
            vec![vec![json!(41), json!("Beverages")]],
        );
        let hint = FormatHint::parse("{category:str, quantity:int}");
        assert_eq!(
            from_rows(&hint, &rs, None, None),
            Some(json!({"category": "Beverages", "quantity": 41}))
        );
    }

    #[test]
    fn parses_model_text() {
        assert_eq!(from_text(&FormatHint::Int, "The window is 14 days."), Some(json!(14)));
        assert_eq!(from_text(&FormatHint::Float, "```\n$1,234.567\n```"), Some(json!(1234.57)));
        assert_eq!(from_text(&FormatHint::Int, "unknown"), None);
        let hint = FormatHint::parse("{customer:str, margin:float}");
        assert_eq!(
            from_text(&hint, "Answer: {\"customer\": \"Ernst Handel\", \"margin\": 330}"),
            Some(json!({"customer": "Ernst Handel", "margin": 330.0}))
        );
        let list = FormatHint::parse("list[{product:str}]");
        assert_eq!(from_text(&list, "[{\"product\": \"Chai\"}]"), Some(json!([{"product": "Chai"}])));
    }

    #[test]
    fn numbers_inside_dates_are_not_whole_values() {
        let found: Vec<f64> = numbers("Dates: 1997-12-01, budget $1,500.50").collect();
        assert_eq!(found, vec![1997.0, -12.0, -1.0, 1500.5]);
    }
}
