//! Static schema description of the dataset.

use serde::{Deserialize, Serialize};

use super::format_hint::normalize_key;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Table and column names with types, in database order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub tables: Vec<TableSchema>,
}

impl SchemaDescription {
    pub fn new(tables: Vec<TableSchema>) -> Self {
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// Resolve a loosely written table reference (`OrderDetails`,
    /// `order_details`) to the schema's spelling.
    pub fn resolve_table(&self, loose: &str) -> Option<&str> {
        let wanted = normalize_key(loose);
        self.tables
            .iter()
            .find(|t| normalize_key(&t.name) == wanted)
            .map(|t| t.name.as_str())
    }

    /// Table and column names containing whitespace; these need quoting.
    pub fn multi_word_identifiers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for t in &self.tables {
            if t.name.contains(char::is_whitespace) {
                out.push(t.name.as_str());
            }
            for c in &t.columns {
                if c.name.contains(char::is_whitespace) && !out.contains(&c.name.as_str()) {
                    out.push(c.name.as_str());
                }
            }
        }
        out
    }

    /// Schema tables mentioned in `sql`, in schema order.
    ///
    /// A table counts as mentioned when its name occurs bounded by
    /// non-identifier characters, quoted or not.
    pub fn tables_referenced_in(&self, sql: &str) -> Vec<&str> {
        let lower = sql.to_ascii_lowercase();
        self.tables
            .iter()
            .filter(|t| contains_identifier(&lower, &t.name.to_ascii_lowercase()))
            .map(|t| t.name.as_str())
            .collect()
    }

    /// `Table: col (TYPE), ...` one line per table, for prompts.
    pub fn summary(&self) -> String {
        self.tables
            .iter()
            .map(|t| {
                let cols: Vec<String> = t
                    .columns
                    .iter()
                    .map(|c| format!("{} ({})", c.name, c.data_type))
                    .collect();
                format!("{}: {}", t.name, cols.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn contains_identifier(haystack: &str, ident: &str) -> bool {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(ident).any(|(i, _)| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + ident.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SchemaDescription {
        let col = |n: &str| ColumnSchema { name: n.into(), data_type: "INTEGER".into() };
        SchemaDescription::new(vec![
            TableSchema { name: "Orders".into(), columns: vec![col("OrderID")] },
            TableSchema { name: "Order Details".into(), columns: vec![col("OrderID")] },
        ])
    }

    #[test]
    fn references_respect_identifier_boundaries() {
        let s = schema();
        let refs = s.tables_referenced_in(r#"SELECT * FROM "Order Details" od"#);
        assert_eq!(refs, vec!["Order Details"]);
        let refs = s.tables_referenced_in("SELECT * FROM Orders o JOIN \"Order Details\" d");
        assert_eq!(refs, vec!["Orders", "Order Details"]);
    }

    #[test]
    fn resolves_collapsed_spellings() {
        let s = schema();
        assert_eq!(s.resolve_table("OrderDetails"), Some("Order Details"));
        assert_eq!(s.resolve_table("order_details"), Some("Order Details"));
        assert_eq!(s.resolve_table("Invoices"), None);
        assert_eq!(s.multi_word_identifiers(), vec!["Order Details"]);
    }
}
