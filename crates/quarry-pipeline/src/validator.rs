//! Response Validator.
//!
//! Checks the composed answer against the declared hint, the citation rule
//! and the confidence range. A value that does not conform gets one
//! best-effort coercion; if that fails too the value is replaced by the
//! hint's zero value and the answer is marked invalid. The validator never
//! regenerates an answer and only lowers confidence.

use quarry_core::constants::{MISSING_CITATION_FACTOR, VALIDATION_FALLBACK_CONFIDENCE};
use quarry_core::models::{Answer, FieldSpec, FieldType, FormatHint};
use serde_json::{Map, Value};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Coerced,
    Rejected,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Coerced => "coerced",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub answer: Answer,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    /// `stages_ran` is true when fragments were retrieved or a query executed;
    /// such answers must cite something.
    pub fn validate(&self, mut answer: Answer, hint: &FormatHint, stages_ran: bool) -> Validated {
        if !(0.0..=1.0).contains(&answer.confidence) {
            warn!(confidence = answer.confidence, "confidence out of range, annotated to 0");
            answer.confidence = 0.0;
        }

        let verdict = if hint.conforms(&answer.value) {
            Verdict::Accepted
        } else if let Some(value) = coerce(hint, &answer.value) {
            debug!(%hint, "answer value coerced");
            answer.value = value;
            Verdict::Coerced
        } else {
            warn!(%hint, value = %answer.value, "answer value rejected");
            answer.value = hint.zero_value();
            answer.valid = false;
            answer.confidence = answer.confidence.min(VALIDATION_FALLBACK_CONFIDENCE);
            Verdict::Rejected
        };

        if stages_ran && answer.citations.is_empty() {
            debug!("answer cites nothing although a stage ran");
            answer.confidence *= MISSING_CITATION_FACTOR;
        }

        Validated { answer, verdict }
    }
}

/// One coercion attempt toward `hint`. `None` when the result still
/// would not conform.
fn coerce(hint: &FormatHint, value: &Value) -> Option<Value> {
    let candidate = match hint {
        FormatHint::Int | FormatHint::Float | FormatHint::Text => {
            scalar(hint.scalar_type()?, sole_value(value))?
        }
        FormatHint::Object(fields) => align(fields, &sole_object(fields, value)?)?,
        FormatHint::List(fields) => match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.as_object().and_then(|o| align(fields, o)))
                    .collect::<Option<Vec<_>>>()?,
            ),
            // {"items": [...]} around a bare list.
            Value::Object(map) if map.len() == 1 && map.values().all(Value::is_array) => {
                let items = map.values().next()?.as_array()?;
                Value::Array(
                    items
                        .iter()
                        .map(|item| item.as_object().and_then(|o| align(fields, o)))
                        .collect::<Option<Vec<_>>>()?,
                )
            }
            Value::Object(map) => Value::Array(vec![align(fields, map)?]),
            _ => return None,
        },
    };
    hint.conforms(&candidate).then_some(candidate)
}

/// Unwrap a single-entry object or a one-element list.
fn sole_value(value: &Value) -> &Value {
    match value {
        Value::Object(map) if map.len() == 1 => map.values().next().unwrap_or(value),
        Value::Array(items) if items.len() == 1 => &items[0],
        _ => value,
    }
}

fn sole_object(fields: &[FieldSpec], value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::Array(items) if items.len() == 1 => items[0].as_object().cloned(),
        scalar if fields.len() == 1 && !scalar.is_null() => {
            let mut map = Map::new();
            map.insert(fields[0].name.clone(), scalar.clone());
            Some(map)
        }
        _ => None,
    }
}

/// Rename keys to the declared spelling and coerce field types. Every
/// declared field must be present under some spelling.
fn align(fields: &[FieldSpec], map: &Map<String, Value>) -> Option<Value> {
    if fields.is_empty() {
        return Some(Value::Object(map.clone()));
    }
    let mut out = Map::new();
    for field in fields {
        let wanted = loose(&field.name);
        let (_, v) = map.iter().find(|(k, _)| loose(k) == wanted)?;
        out.insert(field.name.clone(), scalar(field.field_type, v)?);
    }
    Some(Value::Object(out))
}

/// Scalar conversion that never rounds: only integral numbers become ints.
fn scalar(field: FieldType, value: &Value) -> Option<Value> {
    if field == FieldType::Int {
        let f = match value {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if f.fract() != 0.0 {
            return None;
        }
    }
    field.coerce(value)
}

fn loose(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
