//! Output-shape hints declared by the caller.
//!
//! Grammar (whitespace-insensitive, case-insensitive keywords):
//!
//! ```text
//! int | integer
//! float | number | double
//! {name:type, ...}          object with typed fields
//! list[{name:type, ...}]    ordered list of such objects
//! dict | object | list      untyped containers
//! anything else             free text
//! ```
//!
//! Field types are `int`, `float` and `str`. Unknown field types read as `str`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::constants::FLOAT_ANSWER_DECIMALS;

/// Scalar type of a declared object field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Int,
    Float,
    Str,
}

impl FieldType {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Self::Int,
            "float" | "number" | "double" | "decimal" => Self::Float,
            _ => Self::Str,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
        }
    }

    /// Whether `value` already has this type.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Str => value.is_string(),
        }
    }

    /// Coerce a scalar into this type. Returns `None` when no sensible
    /// conversion exists (null, containers, non-numeric strings for numbers).
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match self {
            Self::Int => match value {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().map(|f| f.round() as i64))
                    .map(Value::from),
                Value::String(s) => parse_number(s).map(|f| Value::from(f.round() as i64)),
                Value::Bool(b) => Some(Value::from(i64::from(*b))),
                _ => None,
            },
            Self::Float => match value {
                Value::Number(n) => n.as_f64().and_then(float_value),
                Value::String(s) => parse_number(s).and_then(float_value),
                _ => None,
            },
            Self::Str => match value {
                Value::String(s) => Some(Value::String(s.clone())),
                Value::Number(n) => Some(Value::String(n.to_string())),
                Value::Bool(b) => Some(Value::String(b.to_string())),
                _ => None,
            },
        }
    }

    pub fn zero_value(self) -> Value {
        match self {
            Self::Int => Value::from(0i64),
            Self::Float => Value::from(0.0f64),
            Self::Str => Value::String(String::new()),
        }
    }
}

/// A named, typed field of an object-shaped answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
}

/// The declared expected structure of a final answer value.
///
/// An empty field list on `Object`/`List` means the container is untyped:
/// any keys are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FormatHint {
    Int,
    Float,
    Text,
    Object(Vec<FieldSpec>),
    List(Vec<FieldSpec>),
}

impl FormatHint {
    /// Parse a hint descriptor. Never fails: unrecognized descriptors are `Text`.
    pub fn parse(raw: &str) -> Self {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let lower = compact.to_ascii_lowercase();
        match lower.as_str() {
            "int" | "integer" => return Self::Int,
            "float" | "number" | "double" => return Self::Float,
            "dict" | "object" | "{}" => return Self::Object(Vec::new()),
            "list" | "list[]" | "list[dict]" | "list[object]" => return Self::List(Vec::new()),
            _ => {}
        }
        if lower.starts_with("list[") && lower.ends_with(']') {
            let inner = &compact[5..compact.len() - 1];
            if let Some(fields) = parse_object_fields(inner) {
                return Self::List(fields);
            }
        }
        if let Some(fields) = parse_object_fields(&compact) {
            return Self::Object(fields);
        }
        Self::Text
    }

    /// Declared fields for object and list hints; empty for scalars.
    pub fn fields(&self) -> &[FieldSpec] {
        match self {
            Self::Object(fields) | Self::List(fields) => fields,
            _ => &[],
        }
    }

    /// Field type of a scalar hint.
    pub fn scalar_type(&self) -> Option<FieldType> {
        match self {
            Self::Int => Some(FieldType::Int),
            Self::Float => Some(FieldType::Float),
            Self::Text => Some(FieldType::Str),
            _ => None,
        }
    }

    /// The zero/empty value of this shape, used whenever no data is available.
    pub fn zero_value(&self) -> Value {
        match self {
            Self::Int => FieldType::Int.zero_value(),
            Self::Float => FieldType::Float.zero_value(),
            Self::Text => FieldType::Str.zero_value(),
            Self::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|f| (f.name.clone(), f.field_type.zero_value()))
                    .collect(),
            ),
            Self::List(_) => Value::Array(Vec::new()),
        }
    }

    /// Whether `value` structurally matches this hint: field presence,
    /// field types and container arity.
    pub fn conforms(&self, value: &Value) -> bool {
        match self {
            Self::Int => FieldType::Int.matches(value),
            Self::Float => FieldType::Float.matches(value),
            Self::Text => value.is_string(),
            Self::Object(fields) => object_conforms(fields, value),
            Self::List(fields) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|item| object_conforms(fields, item))),
        }
    }

    /// Coerce a flat record into the object shape declared by `fields`.
    ///
    /// Keys are aligned by name (case-insensitive, `_`/space-insensitive),
    /// then by position for fields that found no named column.
    pub fn shape_record(fields: &[FieldSpec], record: &[(String, Value)]) -> Value {
        if fields.is_empty() {
            return Value::Object(record.iter().cloned().collect());
        }
        let mut used = vec![false; record.len()];
        let mut slots: Vec<Option<usize>> = fields
            .iter()
            .map(|field| {
                let idx = record
                    .iter()
                    .position(|(col, _)| normalize_key(col) == normalize_key(&field.name));
                if let Some(i) = idx {
                    used[i] = true;
                }
                idx
            })
            .collect();
        for slot in slots.iter_mut().filter(|s| s.is_none()) {
            if let Some(free) = used.iter().position(|u| !u) {
                used[free] = true;
                *slot = Some(free);
            }
        }

        let mut out = Map::new();
        for (field, slot) in fields.iter().zip(slots) {
            let value = slot
                .and_then(|i| field.field_type.coerce(&record[i].1))
                .unwrap_or_else(|| field.field_type.zero_value());
            out.insert(field.name.clone(), value);
        }
        Value::Object(out)
    }
}

impl fmt::Display for FormatHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn fields_str(fields: &[FieldSpec]) -> String {
            let inner: Vec<String> = fields
                .iter()
                .map(|fs| format!("{}:{}", fs.name, fs.field_type.as_str()))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        match self {
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Text => f.write_str("str"),
            Self::Object(fields) if fields.is_empty() => f.write_str("dict"),
            Self::Object(fields) => f.write_str(&fields_str(fields)),
            Self::List(fields) if fields.is_empty() => f.write_str("list"),
            Self::List(fields) => write!(f, "list[{}]", fields_str(fields)),
        }
    }
}

impl From<String> for FormatHint {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<FormatHint> for String {
    fn from(hint: FormatHint) -> Self {
        hint.to_string()
    }
}

/// Round a float to the answer precision and wrap it as a JSON number.
pub fn float_value(f: f64) -> Option<Value> {
    if !f.is_finite() {
        return None;
    }
    let scale = 10f64.powi(FLOAT_ANSWER_DECIMALS);
    Number::from_f64((f * scale).round() / scale).map(Value::Number)
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim()
        .trim_start_matches('$')
        .replace(',', "")
        .parse::<f64>()
        .ok()
}

fn parse_object_fields(compact: &str) -> Option<Vec<FieldSpec>> {
    let inner = compact.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() {
        return Some(Vec::new());
    }
    let fields = inner
        .split(',')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once(':') {
            Some((name, ty)) => FieldSpec {
                name: name.trim_matches(|c| c == '"' || c == '\'').to_string(),
                field_type: FieldType::parse(ty),
            },
            None => FieldSpec {
                name: part.trim_matches(|c| c == '"' || c == '\'').to_string(),
                field_type: FieldType::Str,
            },
        })
        .collect();
    Some(fields)
}

fn object_conforms(fields: &[FieldSpec], value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    if fields.is_empty() {
        return true;
    }
    obj.len() == fields.len()
        && fields.iter().all(|field| {
            obj.get(&field.name)
                .is_some_and(|v| field.field_type.matches(v))
        })
}

pub(crate) fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
