//! Well-formedness and read-only checks on query text.

use std::sync::LazyLock;

use quarry_core::models::{ConstraintKey, ConstraintSet, SchemaDescription};
use regex::Regex;

use crate::templates::exclusive_end;

/// Statement keywords that can modify the dataset or the connection.
const DESTRUCTIVE: &[&str] = &[
    "alter", "attach", "create", "delete", "detach", "drop", "insert", "pragma", "reindex",
    "replace", "update", "upsert", "vacuum",
];

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```[a-z]*").expect("fence regex is valid"));

static STATEMENT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(select|with)\b").expect("statement regex is valid"));

/// Write clauses in statement position. Bare words such as the `replace()`
/// function or a column named `update` do not match.
static WRITE_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:insert|replace)(?:\s+or\s+[a-z]+)?\s+into|delete\s+from|update\s+(?:or\s+[a-z]+\s+)?\S+\s+set|(?:create|drop|alter)\s+(?:(?:temp|temporary|unique|virtual)\s+)?(?:table|view|index|trigger)|(?:attach|detach)\s+database)\b",
    )
    .expect("write clause regex is valid")
});

/// `FROM x` / `JOIN x` with x quoted, bracketed, backticked or bare.
pub(crate) static TABLE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:from|join)\s+(?:"([^"]+)"|\[([^\]]+)\]|`([^`]+)`|([A-Za-z_][A-Za-z0-9_]*))"#)
        .expect("table reference regex is valid")
});

/// `EXTRACT(YEAR FROM x)` is not a table reference.
static EXTRACT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bextract\s*\(\s*[A-Za-z]+\s+from\b").expect("extract regex is valid")
});

static CTE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([A-Za-z_][A-Za-z0-9_]*)\s+as\s*\(").expect("cte regex is valid")
});

/// Remove markdown code fences and trailing semicolons.
pub fn strip_fences(sql: &str) -> String {
    let cleaned = FENCE.replace_all(sql, "");
    cleaned.trim().trim_end_matches(';').trim().to_string()
}

/// Pull the first SQL statement out of free-form model text.
pub fn extract_sql(text: &str) -> Option<String> {
    let cleaned = FENCE.replace_all(text, "");
    let start = STATEMENT_START.find(&cleaned)?.start();
    let body = &cleaned[start..];
    let end = statement_end(body).unwrap_or(body.len());
    let sql = body[..end].trim().to_string();
    (!sql.is_empty()).then_some(sql)
}

/// Reject multi-statement input and statements that are not queries.
pub fn check_read_only(sql: &str) -> Result<(), String> {
    let masked = mask_literals(sql);
    if let Some(end) = statement_end(&masked) {
        if !masked[end + 1..].trim().trim_matches(';').trim().is_empty() {
            return Err("multiple statements are not allowed".to_string());
        }
    }
    let first = masked
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .find(|w| !w.is_empty())
        .unwrap_or("")
        .to_ascii_lowercase();
    if DESTRUCTIVE.contains(&first.as_str()) {
        return Err(format!(
            "read-only dataset: {} statements are rejected",
            first.to_ascii_uppercase()
        ));
    }
    Ok(())
}

/// Basic well-formedness of generated SQL against the schema.
///
/// Table references must name a schema table, a CTE, or a loose spelling of
/// a schema table (`OrderDetails`, or the unquoted first word of a
/// multi-word name). Loose spellings pass so the runner reports the exact
/// error and repair can correct it.
pub fn check_well_formed(sql: &str, schema: &SchemaDescription) -> Result<(), String> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err("empty query".to_string());
    }
    let first = trimmed
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    if first != "select" && first != "with" {
        return Err(format!("query must start with SELECT or WITH, found '{first}'"));
    }
    balanced(trimmed)?;
    check_read_only(trimmed)?;

    let masked = mask_literals(trimmed);
    if let Some(clause) = WRITE_CLAUSE.find(&masked) {
        return Err(format!("forbidden write clause '{}'", clause.as_str()));
    }

    let ctes: Vec<String> = CTE_NAME
        .captures_iter(&masked)
        .map(|c| c[1].to_ascii_lowercase())
        .collect();
    for name in table_references(&masked) {
        let known = schema.has_table(&name)
            || ctes.contains(&name.to_ascii_lowercase())
            || schema.resolve_table(&name).is_some()
            || schema.multi_word_identifiers().iter().any(|ident| {
                ident
                    .split_whitespace()
                    .next()
                    .is_some_and(|w| w.eq_ignore_ascii_case(&name))
            });
        if !known {
            return Err(format!("unknown table '{name}'"));
        }
    }
    Ok(())
}

/// Constraint entries the query does not visibly honour.
pub fn missing_constraints(sql: &str, constraints: &ConstraintSet) -> Vec<ConstraintKey> {
    let lower = sql.to_ascii_lowercase();
    let mut missing = Vec::new();
    if let Some(start) = constraints.date_start() {
        if !lower.contains(&start.format("%Y-%m-%d").to_string()) {
            missing.push(ConstraintKey::DateStart);
        }
    }
    if let Some(end) = constraints.date_end() {
        let inclusive = end.format("%Y-%m-%d").to_string();
        let exclusive = exclusive_end(end).format("%Y-%m-%d").to_string();
        if !lower.contains(&inclusive) && !lower.contains(&exclusive) {
            missing.push(ConstraintKey::DateEnd);
        }
    }
    if let Some(category) = constraints.category() {
        if !lower.contains(&format!("'{}'", category.to_ascii_lowercase())) {
            missing.push(ConstraintKey::CategoryFilter);
        }
    }
    if let Some(n) = constraints.top_n() {
        let squashed = lower.split_whitespace().collect::<Vec<_>>().join(" ");
        if !squashed.contains(&format!("limit {n}")) {
            missing.push(ConstraintKey::TopN);
        }
    }
    missing
}

/// Names in `FROM`/`JOIN` position, unquoted, in query order.
pub fn table_references(sql: &str) -> Vec<String> {
    let sql = EXTRACT_FROM.replace_all(sql, "extract(");
    TABLE_REF
        .captures_iter(&sql)
        .filter_map(|c| {
            (1..=4)
                .find_map(|i| c.get(i))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

/// Replace the contents of single-quoted literals with spaces.
fn mask_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_literal = false;
    for c in sql.chars() {
        if c == '\'' {
            in_literal = !in_literal;
            out.push(c);
        } else if in_literal {
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

/// Byte offset of the first `;` outside quotes.
fn statement_end(sql: &str) -> Option<usize> {
    let (mut single, mut double) = (false, false);
    for (i, c) in sql.char_indices() {
        match c {
            '\'' if !double => single = !single,
            '"' if !single => double = !double,
            ';' if !single && !double => return Some(i),
            _ => {}
        }
    }
    None
}

fn balanced(sql: &str) -> Result<(), String> {
    let (mut single, mut double) = (false, false);
    let mut depth: i32 = 0;
    for c in sql.chars() {
        match c {
            '\'' if !double => single = !single,
            '"' if !single => double = !double,
            '(' if !single && !double => depth += 1,
            ')' if !single && !double => {
                depth -= 1;
                if depth < 0 {
                    return Err("unbalanced parentheses".to_string());
                }
            }
            _ => {}
        }
    }
    if single || double {
        return Err("unterminated quote".to_string());
    }
    if depth != 0 {
        return Err("unbalanced parentheses".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use quarry_core::models::{ColumnSchema, ConstraintSource, ConstraintValue, TableSchema};

    fn schema() -> SchemaDescription {
        let t = |name: &str| TableSchema {
            name: name.into(),
            columns: vec![ColumnSchema { name: "OrderID".into(), data_type: "INTEGER".into() }],
        };
        SchemaDescription::new(vec![t("Orders"), t("Order Details"), t("Products")])
    }

    #[test]
    fn extracts_statement_from_chatter() {
        let text = "Here you go:\n```sql\nSELECT 1 AS one;\n```\nHope this helps";
        assert_eq!(extract_sql(text).as_deref(), Some("SELECT 1 AS one"));
        assert_eq!(extract_sql("no query here"), None);
    }

    #[test]
    fn read_only_check_rejects_writes_and_batches() {
        assert!(check_read_only("SELECT * FROM Orders").is_ok());
        assert!(check_read_only("SELECT ';' AS s").is_ok());
        assert!(check_read_only("delete from Orders").is_err());
        assert!(check_read_only("SELECT 1; DROP TABLE Orders").is_err());
    }

    #[test]
    fn well_formedness() {
        let s = schema();
        assert!(check_well_formed(r#"SELECT * FROM "Order Details" od JOIN Orders o ON 1"#, &s).is_ok());
        assert!(check_well_formed("WITH x AS (SELECT 1) SELECT * FROM x", &s).is_ok());
        // Loose spellings pass through to the runner.
        assert!(check_well_formed("SELECT * FROM Order Details", &s).is_ok());
        assert!(check_well_formed("SELECT * FROM OrderDetails", &s).is_ok());

        assert!(check_well_formed("", &s).is_err());
        assert!(check_well_formed("EXPLAIN SELECT 1", &s).is_err());
        assert!(check_well_formed("SELECT (1", &s).is_err());
        assert!(check_well_formed("SELECT 'x", &s).is_err());
        assert!(check_well_formed("SELECT * FROM Invoices", &s).is_err());
        assert!(check_well_formed("SELECT * FROM Orders WHERE 1; DELETE FROM Orders", &s).is_err());
        assert!(check_well_formed("SELECT 'drop' AS word FROM Orders", &s).is_ok());
        assert!(check_well_formed("SELECT EXTRACT(YEAR FROM o.OrderDate) FROM Orders o", &s).is_ok());
    }

    #[test]
    fn read_only_functions_and_column_names_pass() {
        let s = schema();
        let stripped = "SELECT COUNT(*) AS n FROM Products WHERE replace(ProductName,' ','') <> ''";
        assert!(check_well_formed(stripped, &s).is_ok());
        assert!(check_well_formed("SELECT o.update, o.create FROM Orders o", &s).is_ok());

        let cte_write = "WITH x AS (SELECT 1) INSERT INTO Orders SELECT * FROM x";
        assert!(check_well_formed(cte_write, &s).unwrap_err().contains("write clause"));
        let replace_into = "WITH x AS (SELECT 1) REPLACE INTO Orders SELECT * FROM x";
        assert!(check_well_formed(replace_into, &s).is_err());
        let update = "WITH x AS (SELECT 1) UPDATE Orders SET OrderID = 1";
        assert!(check_well_formed(update, &s).is_err());
    }

    #[test]
    fn detects_missing_constraints() {
        let mut c = ConstraintSet::new();
        let d = |s: &str| ConstraintValue::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap());
        c.insert(ConstraintKey::DateStart, d("1997-12-01"), ConstraintSource::Question);
        c.insert(ConstraintKey::DateEnd, d("1997-12-31"), ConstraintSource::Question);
        c.insert(ConstraintKey::TopN, ConstraintValue::Count(3), ConstraintSource::Question);

        let ok = "SELECT 1 FROM Orders o WHERE o.OrderDate >= '1997-12-01' AND o.OrderDate < '1998-01-01' LIMIT 3";
        assert!(missing_constraints(ok, &c).is_empty());

        let gaps = missing_constraints("SELECT 1 FROM Orders LIMIT 5", &c);
        assert_eq!(
            gaps,
            vec![ConstraintKey::DateStart, ConstraintKey::DateEnd, ConstraintKey::TopN]
        );
    }
}
