//! Rule-based rewrites tried before any generative repair.
//!
//! Each rule targets a mistake generated SQL makes against SQLite: unquoted
//! multi-word table names, collapsed spellings of them, and date functions
//! from other dialects.

use std::sync::LazyLock;

use quarry_core::models::SchemaDescription;
use regex::{Captures, Regex};

use crate::guard::{self, TABLE_REF};

static EXTRACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bextract\s*\(\s*(year|month|day)\s+from\s+([^()]+?)\s*\)")
        .expect("extract regex is valid")
});

static DATE_PART_FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(year|month|day)\s*\(\s*([^()]+?)\s*\)").expect("date part regex is valid")
});

static SELECT_TOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\s*select\s+(?:distinct\s+)?)top\s+(\d+)\s+").expect("top regex is valid")
});

static HAS_LIMIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blimit\s+\d+").expect("limit regex is valid"));

/// Apply every rewrite rule. `Some` only when the text changed.
pub fn rule_repair(sql: &str, schema: &SchemaDescription) -> Option<String> {
    let original = guard::strip_fences(sql);
    let mut repaired = quote_multi_word(&original, schema);
    repaired = resolve_table_spellings(&repaired, schema);
    repaired = rewrite_date_parts(&repaired);
    repaired = rewrite_select_top(&repaired);
    (repaired != original).then_some(repaired)
}

/// Quote bare occurrences of multi-word identifiers.
fn quote_multi_word(sql: &str, schema: &SchemaDescription) -> String {
    let mut out = sql.to_string();
    for ident in schema.multi_word_identifiers() {
        let words: Vec<String> = ident.split_whitespace().map(regex::escape).collect();
        let pattern = format!(
            r#"(?i)(^|[^"\[`\w]){}($|[^"\]`\w])"#,
            words.join(r"\s+")
        );
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        // Adjacent matches share a boundary character; loop until stable.
        loop {
            let next = re
                .replace_all(&out, |c: &Captures| format!("{}\"{ident}\"{}", &c[1], &c[2]))
                .into_owned();
            if next == out {
                break;
            }
            out = next;
        }
    }
    out
}

/// Replace `FROM OrderDetails` style references with the schema spelling.
fn resolve_table_spellings(sql: &str, schema: &SchemaDescription) -> String {
    TABLE_REF
        .replace_all(sql, |c: &Captures| {
            let whole = &c[0];
            let Some(bare) = c.get(4) else {
                return whole.to_string();
            };
            if schema.has_table(bare.as_str()) {
                return whole.to_string();
            }
            match schema.resolve_table(bare.as_str()) {
                Some(real) => {
                    let keyword_len = bare.start() - c.get(0).map_or(0, |m| m.start());
                    format!("{}{}", &whole[..keyword_len], quote_if_needed(real))
                }
                None => whole.to_string(),
            }
        })
        .into_owned()
}

fn rewrite_date_parts(sql: &str) -> String {
    let sql = EXTRACT.replace_all(sql, |c: &Captures| strftime_cast(&c[1], &c[2]));
    DATE_PART_FN
        .replace_all(&sql, |c: &Captures| strftime_cast(&c[1], &c[2]))
        .into_owned()
}

fn rewrite_select_top(sql: &str) -> String {
    let Some(caps) = SELECT_TOP.captures(sql) else {
        return sql.to_string();
    };
    let n = caps[2].to_string();
    let rest = SELECT_TOP.replace(sql, "$1").into_owned();
    if HAS_LIMIT.is_match(&rest) {
        rest
    } else {
        format!("{} LIMIT {n}", rest.trim_end())
    }
}

fn strftime_cast(part: &str, expr: &str) -> String {
    let format = match part.to_ascii_lowercase().as_str() {
        "year" => "%Y",
        "month" => "%m",
        _ => "%d",
    };
    format!("CAST(strftime('{format}', {}) AS INTEGER)", expr.trim())
}

fn quote_if_needed(name: &str) -> String {
    if name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("\"{name}\"")
    }
}
