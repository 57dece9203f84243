//! Table metadata and its textual description

use std::collections::HashSet;

/// Metadata for one table, as reported by the database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    /// Names of the primary key columns
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

/// Metadata for one column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub autoincrement: bool,
    /// Column comment, for backends that store one. SQLite has no column
    /// comments, so its introspection leaves this empty. Never rendered.
    pub comment: Option<String>,
}

/// A foreign key constraint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

/// Describe tables in the order given, separated by blank lines
pub fn describe_tables(tables: &[TableSchema]) -> String {
    tables
        .iter()
        .map(describe_table)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Describe a single table
///
/// ```text
/// orders:
///     id: primary key, INTEGER, nullable
///     customer_id: INTEGER
///
///     Relationships:
///       customer_id -> customers.id
/// ```
pub fn describe_table(table: &TableSchema) -> String {
    let primary_keys: HashSet<&str> = table.primary_keys.iter().map(String::as_str).collect();
    let mut lines = vec![format!("{}:", table.name)];

    for column in &table.columns {
        lines.push(format!(
            "    {}: {}",
            column.name,
            column_parts(column, primary_keys.contains(column.name.as_str())).join(", ")
        ));
    }

    if !table.foreign_keys.is_empty() {
        lines.push(String::new());
        lines.push("    Relationships:".to_string());
        for fk in &table.foreign_keys {
            lines.push(format!(
                "      {} -> {}.{}",
                fk.columns.join(", "),
                fk.referenced_table,
                fk.referenced_columns.join(", ")
            ));
        }
    }

    lines.join("\n")
}

fn column_parts(column: &ColumnSchema, is_primary_key: bool) -> Vec<String> {
    let mut parts = Vec::new();
    if is_primary_key {
        parts.push("primary key".to_string());
    }
    parts.push(column.data_type.clone());

    // Boolean flags render bare, valued flags as key=value, falsy ones not at all
    if column.nullable {
        parts.push("nullable".to_string());
    }
    if let Some(default) = column.default.as_deref().filter(|d| !d.is_empty()) {
        parts.push(format!("default={}", default));
    }
    if column.autoincrement {
        parts.push("autoincrement".to_string());
    }

    parts
}
