//! Prompt text for SQL generation and repair.

use quarry_core::models::{ConstraintSet, SchemaDescription};

const RULES: &str = "\
Rules:
- SQLite dialect. One SELECT statement, no other statement types.
- Quote table names that contain spaces with double quotes, e.g. \"Order Details\".
- Dates are stored as 'YYYY-MM-DD' text. Filter with >= start and < the day after end.
- Revenue is SUM(UnitPrice * Quantity * (1 - Discount)) over \"Order Details\".
- Apply every constraint listed below.
- Reply with the SQL only. No explanation, no markdown.";

pub fn sql_prompt(question: &str, constraints: &ConstraintSet, schema: &SchemaDescription) -> String {
    format!(
        "Write a SQL query that answers the question.\n\n\
         Schema:\n{}\n\n{RULES}\n\nConstraints:\n{}\n\nQuestion: {question}\nSQL:",
        schema.summary(),
        constraints.describe(),
    )
}

pub fn repair_prompt(
    question: &str,
    constraints: &ConstraintSet,
    schema: &SchemaDescription,
    failed_sql: &str,
    reason: &str,
) -> String {
    format!(
        "The query below failed. Return a corrected query.\n\n\
         Schema:\n{}\n\n{RULES}\n\nConstraints:\n{}\n\nQuestion: {question}\n\n\
         Failed query:\n{failed_sql}\n\nError: {reason}\nCorrected SQL:",
        schema.summary(),
        constraints.describe(),
    )
}
