//! Properties of the rule-based rewrites.

use proptest::prelude::*;
use quarry_core::models::{ColumnSchema, SchemaDescription, TableSchema};
use quarry_sql::repair::rule_repair;

fn schema() -> SchemaDescription {
    let t = |name: &str| TableSchema {
        name: name.into(),
        columns: vec![ColumnSchema { name: "OrderID".into(), data_type: "INTEGER".into() }],
    };
    SchemaDescription::new(vec![t("Orders"), t("Order Details"), t("Products")])
}

fn query_text() -> impl Strategy<Value = String> {
    let table = prop_oneof![
        Just("Orders"),
        Just("Order Details"),
        Just("\"Order Details\""),
        Just("OrderDetails"),
        Just("Products"),
    ];
    let column = prop_oneof![
        Just("COUNT(*)"),
        Just("EXTRACT(YEAR FROM OrderDate)"),
        Just("MONTH(OrderDate)"),
        Just("OrderID"),
    ];
    let top = prop_oneof![Just(""), Just("TOP 5 ")];
    (top, column, table).prop_map(|(top, column, table)| format!("SELECT {top}{column} FROM {table}"))
}

proptest! {
    #[test]
    fn repair_reaches_a_fixed_point(sql in query_text()) {
        let schema = schema();
        if let Some(once) = rule_repair(&sql, &schema) {
            prop_assert_ne!(&once, &sql);
            prop_assert_eq!(rule_repair(&once, &schema), None);
        }
    }

    #[test]
    fn repaired_text_has_no_bare_multi_word_table(sql in query_text()) {
        let schema = schema();
        let out = rule_repair(&sql, &schema).unwrap_or(sql);
        let unquoted = out.replace("\"Order Details\"", "");
        prop_assert!(!unquoted.contains("Order Details"));
        prop_assert!(!unquoted.contains("OrderDetails"));
    }

    #[test]
    fn repair_never_panics(sql in ".{0,200}") {
        let _ = rule_repair(&sql, &schema());
    }
}
