//! Query Runner: execute one statement and classify the outcome.

use std::time::{Duration, Instant};

use quarry_core::config::DatasetConfig;
use quarry_core::models::{QueryOutcome, RowSet};
use quarry_core::tracing::metrics;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode};
use serde_json::Value;
use tracing::debug;

use crate::guard;

/// VM instructions between timeout checks.
const PROGRESS_INTERVAL: i32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    pub timeout: Duration,
    pub max_rows: usize,
}

impl RunnerOptions {
    pub fn from_config(config: &DatasetConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.effective_query_timeout_ms()),
            max_rows: config.effective_max_rows(),
        }
    }
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self::from_config(&DatasetConfig::default())
    }
}

/// Execute `sql` on `conn`.
///
/// - destructive or multi-statement input: `SyntaxFailure`, never executed
/// - prepare errors (parse errors, unknown tables or columns): `SyntaxFailure`
/// - errors while stepping, including the timeout interrupt: `ExecutionFailure`
/// - connection-level errors (I/O, corrupt file): `Unavailable`
/// - zero rows: `Empty`
pub fn run(conn: &Connection, sql: &str, options: &RunnerOptions) -> QueryOutcome {
    let sql = guard::strip_fences(sql);
    if let Err(reason) = guard::check_read_only(&sql) {
        return QueryOutcome::SyntaxFailure { reason };
    }

    let mut stmt = match conn.prepare(&sql) {
        Ok(stmt) => stmt,
        Err(e) if is_connection_error(&e) => {
            return QueryOutcome::Unavailable {
                reason: e.to_string(),
            }
        }
        Err(e) => {
            return QueryOutcome::SyntaxFailure {
                reason: e.to_string(),
            }
        }
    };
    if !stmt.readonly() {
        return QueryOutcome::SyntaxFailure {
            reason: "statement would modify the dataset".to_string(),
        };
    }
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let deadline = Instant::now() + options.timeout;
    conn.progress_handler(PROGRESS_INTERVAL, Some(move || Instant::now() > deadline));
    let collected = collect_rows(&mut stmt, columns.len(), options.max_rows);
    conn.progress_handler(0, None::<fn() -> bool>);

    let outcome = match collected {
        Ok(rows) if rows.is_empty() => QueryOutcome::Empty { columns },
        Ok(rows) => QueryOutcome::Rows(RowSet::new(columns, rows)),
        Err(e) if e.sqlite_error_code() == Some(ErrorCode::OperationInterrupted) => {
            QueryOutcome::ExecutionFailure {
                reason: format!(
                    "query timed out after {}ms",
                    options.timeout.as_millis()
                ),
            }
        }
        Err(e) if is_connection_error(&e) => QueryOutcome::Unavailable {
            reason: e.to_string(),
        },
        Err(e) => QueryOutcome::ExecutionFailure {
            reason: e.to_string(),
        },
    };
    debug!(
        kind = ?outcome.kind(),
        { metrics::ROW_COUNT } = outcome.rows().map_or(0, RowSet::len),
        "query executed"
    );
    outcome
}

fn collect_rows(
    stmt: &mut rusqlite::Statement<'_>,
    width: usize,
    max_rows: usize,
) -> rusqlite::Result<Vec<Vec<Value>>> {
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Vec::with_capacity(width);
        for i in 0..width {
            record.push(to_json(row.get_ref(i)?));
        }
        out.push(record);
        if out.len() >= max_rows {
            break;
        }
    }
    Ok(out)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<blob {} bytes>", b.len())),
    }
}

fn is_connection_error(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(
            ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::models::OutcomeKind;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER, name TEXT, price REAL);
             INSERT INTO t VALUES (1, 'a', 1.5), (2, 'b', 2.25);",
        )
        .unwrap();
        conn
    }

    fn run_default(sql: &str) -> QueryOutcome {
        run(&conn(), sql, &RunnerOptions::default())
    }

    #[test]
    fn rows_keep_column_order_and_types() {
        let outcome = run_default("SELECT name, price, id FROM t ORDER BY id");
        let rows = outcome.rows().unwrap();
        assert_eq!(rows.columns, vec!["name", "price", "id"]);
        assert_eq!(rows.rows[1], vec![Value::from("b"), Value::from(2.25), Value::from(2)]);
    }

    #[test]
    fn classifies_failures() {
        assert_eq!(run_default("SELEC 1").kind(), OutcomeKind::SyntaxFailure);
        assert_eq!(run_default("SELECT * FROM missing").kind(), OutcomeKind::SyntaxFailure);
        assert_eq!(run_default("SELECT * FROM t WHERE id > 5").kind(), OutcomeKind::Empty);
        assert_eq!(
            run_default("SELECT abs(-9223372036854775808)").kind(),
            OutcomeKind::ExecutionFailure
        );
    }

    #[test]
    fn destructive_statements_never_run() {
        let c = conn();
        for sql in ["DELETE FROM t", "DROP TABLE t", "UPDATE t SET id = 0", "SELECT 1; DELETE FROM t"] {
            assert_eq!(
                run(&c, sql, &RunnerOptions::default()).kind(),
                OutcomeKind::SyntaxFailure,
                "{sql}"
            );
        }
        let count: i64 = c.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn long_queries_time_out_as_execution_failures() {
        let options = RunnerOptions {
            timeout: Duration::from_millis(20),
            max_rows: 10,
        };
        let sql = "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n)
                   SELECT COUNT(*) FROM n";
        let outcome = run(&conn(), sql, &options);
        assert_eq!(outcome.kind(), OutcomeKind::ExecutionFailure);
        assert!(outcome.failure_reason().unwrap().contains("timed out"));
    }

    #[test]
    fn row_cap_applies() {
        let options = RunnerOptions {
            timeout: Duration::from_secs(5),
            max_rows: 1,
        };
        let outcome = run(&conn(), "SELECT * FROM t", &options);
        assert_eq!(outcome.rows().map(RowSet::len), Some(1));
    }

    #[test]
    fn fenced_sql_is_accepted() {
        let outcome = run_default("```sql\nSELECT COUNT(*) AS n FROM t\n```");
        assert_eq!(outcome.rows().unwrap().first_value(), Some(&Value::from(2)));
    }
}
