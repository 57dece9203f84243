//! SQLite backend: statement execution and table introspection
//!
//! Every operation opens its own connection on a blocking thread and drops
//! it before returning, on success and on error alike. Introspection always
//! opens read-only; statement execution opens read-write unless the gateway
//! is configured read-only.

use anyhow::bail;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OpenFlags, Statement};
use serde_json::Map;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ExecutionError, IntrospectionError};
use crate::schema::{ColumnSchema, ForeignKey, TableSchema};
use crate::value::SqlValue;

/// A result column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Declared type of the source column, when there is one
    pub decl_type: Option<String>,
}

/// Fully materialized rows of a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// What running a statement produced
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The statement returns no rows (DML, DDL)
    Affected(usize),
    /// The statement returns rows
    Rows(ResultSet),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// Handle to a SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    path: PathBuf,
    busy_timeout: Duration,
    read_only_queries: bool,
}

impl SqliteDatabase {
    /// Create a handle from a connection string
    ///
    /// Accepts `sqlite:///relative.db`, `sqlite:////absolute.db` (optionally
    /// with a `+driver` suffix on the scheme) or a bare path.
    pub fn from_url(
        url: &str,
        busy_timeout: Duration,
        read_only_queries: bool,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            path: parse_database_url(url)?,
            busy_timeout,
            read_only_queries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One-line summary for tool descriptions
    pub fn describe_connection(&self) -> String {
        format!(
            "Connected to sqlite version {} database '{}'",
            rusqlite::version(),
            self.path.display()
        )
    }

    /// Run a statement with named parameters
    pub async fn execute(
        &self,
        statement: &str,
        params: &Map<String, serde_json::Value>,
    ) -> Result<QueryOutcome, ExecutionError> {
        let db = self.clone();
        let statement = statement.to_string();
        let params = params.clone();
        let mode = if self.read_only_queries {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        };

        tokio::task::spawn_blocking(move || {
            let conn = db.open(mode).map_err(|source| ExecutionError::Connect {
                path: db.path.clone(),
                source,
            })?;
            run_statement(&conn, &statement, &params)
        })
        .await?
    }

    /// Names of all user tables, sorted
    pub async fn table_names(&self) -> Result<Vec<String>, IntrospectionError> {
        self.introspect(|conn| Ok(list_tables(conn)?)).await
    }

    /// Schemas for the given tables, in the order given
    pub async fn inspect_tables(
        &self,
        names: &[String],
    ) -> Result<Vec<TableSchema>, IntrospectionError> {
        let names = names.to_vec();
        self.introspect(move |conn| {
            names
                .iter()
                .map(|name| Ok(inspect_table(conn, name)?))
                .collect::<Result<Vec<_>, IntrospectionError>>()
        })
        .await
    }

    async fn introspect<T, F>(&self, f: F) -> Result<T, IntrospectionError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, IntrospectionError> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db
                .open(AccessMode::ReadOnly)
                .map_err(|source| IntrospectionError::Connect {
                    path: db.path.clone(),
                    source,
                })?;
            f(&conn)
        })
        .await?
    }

    fn open(&self, mode: AccessMode) -> rusqlite::Result<Connection> {
        let access = match mode {
            AccessMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
            AccessMode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        };
        let flags = access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&self.path, flags)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }
}

fn parse_database_url(url: &str) -> anyhow::Result<PathBuf> {
    let url = url.trim();
    let path = match url.split_once("://") {
        Some((scheme, rest)) => {
            if scheme != "sqlite" && !scheme.starts_with("sqlite+") {
                bail!(
                    "Unsupported database scheme '{}': only sqlite databases are supported",
                    scheme
                );
            }
            match rest.strip_prefix('/') {
                Some(path) => path,
                None if rest.is_empty() => rest,
                None => bail!("Invalid sqlite url {:?}: expected sqlite:///path", url),
            }
        }
        None => url,
    };

    if path.is_empty() || path == ":memory:" || path.starts_with("file::memory:") {
        bail!("In-memory databases are not supported: each call opens its own connection");
    }

    Ok(PathBuf::from(path))
}

// ============================================================================
// Statement execution
// ============================================================================

fn run_statement(
    conn: &Connection,
    statement: &str,
    params: &Map<String, serde_json::Value>,
) -> Result<QueryOutcome, ExecutionError> {
    let mut stmt = conn.prepare(statement)?;
    bind_named(&mut stmt, params)?;

    if stmt.column_count() == 0 {
        return Ok(QueryOutcome::Affected(stmt.raw_execute()?));
    }

    let columns: Vec<Column> = stmt
        .columns()
        .iter()
        .map(|c| Column {
            name: c.name().to_string(),
            decl_type: c.decl_type().map(str::to_string),
        })
        .collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.raw_query();
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            values.push(tag_value(row.get_ref(i)?, column.decl_type.as_deref()));
        }
        rows.push(values);
    }

    Ok(QueryOutcome::Rows(ResultSet { columns, rows }))
}

/// Bind `{"name": value}` pairs to `:name` placeholders
///
/// Keys the statement doesn't mention are skipped.
fn bind_named(
    stmt: &mut Statement<'_>,
    params: &Map<String, serde_json::Value>,
) -> Result<(), ExecutionError> {
    for (name, value) in params {
        let placeholder = if name.starts_with([':', '@', '$']) {
            name.clone()
        } else {
            format!(":{}", name)
        };

        match stmt.parameter_index(&placeholder)? {
            Some(index) => stmt.raw_bind_parameter(index, json_to_sql(name, value)?)?,
            None => tracing::debug!(parameter = %name, "Ignoring parameter not used by statement"),
        }
    }
    Ok(())
}

fn json_to_sql(name: &str, value: &serde_json::Value) -> Result<Value, ExecutionError> {
    use serde_json::Value as Json;

    Ok(match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Integer(i64::from(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if n.is_u64() {
                return Err(ExecutionError::InvalidParameter {
                    name: name.to_string(),
                    reason: format!("{} does not fit in a 64-bit signed integer", n),
                });
            } else {
                Value::Real(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(_) | Json::Object(_) => Value::Text(value.to_string()),
    })
}

/// Tag a raw SQLite value, recognising dates in temporal columns
fn tag_value(value: ValueRef<'_>, decl_type: Option<&str>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            if decl_type.is_some_and(is_temporal_type) {
                parse_temporal(&text).unwrap_or(SqlValue::Text(text))
            } else {
                SqlValue::Text(text)
            }
        }
    }
}

fn is_temporal_type(decl_type: &str) -> bool {
    let upper = decl_type.to_ascii_uppercase();
    upper.contains("DATE") || upper.contains("TIME")
}

fn parse_temporal(text: &str) -> Option<SqlValue> {
    const NAIVE: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    const OFFSET: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"];

    let text = text.trim();
    if let Some(dt) = NAIVE
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(SqlValue::DateTime(dt));
    }
    if let Some(dt) = DateTime::parse_from_rfc3339(text)
        .ok()
        .or_else(|| OFFSET.iter().find_map(|fmt| DateTime::parse_from_str(text, fmt).ok()))
    {
        return Some(SqlValue::DateTimeTz(dt));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(SqlValue::Date)
}

// ============================================================================
// Introspection
// ============================================================================

fn list_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite~_%' ESCAPE '~' \
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

/// Read one table's metadata. Unknown tables come back empty.
fn inspect_table(conn: &Connection, table: &str) -> rusqlite::Result<TableSchema> {
    struct RawColumn {
        name: String,
        data_type: String,
        not_null: bool,
        default: Option<String>,
        pk: i64,
    }

    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    let raw = stmt
        .query_map([table], |row| {
            Ok(RawColumn {
                name: row.get(0)?,
                data_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                not_null: row.get::<_, i64>(2)? != 0,
                default: row.get(3)?,
                pk: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut pk_columns: Vec<(i64, String)> = raw
        .iter()
        .filter(|c| c.pk > 0)
        .map(|c| (c.pk, c.name.clone()))
        .collect();
    pk_columns.sort();
    let primary_keys: Vec<String> = pk_columns.into_iter().map(|(_, name)| name).collect();

    // AUTOINCREMENT only applies to a lone INTEGER PRIMARY KEY
    let autoincrement_column = if primary_keys.len() == 1 && declares_autoincrement(conn, table)? {
        primary_keys.first().cloned()
    } else {
        None
    };

    let columns = raw
        .into_iter()
        .map(|c| ColumnSchema {
            autoincrement: autoincrement_column.as_deref() == Some(c.name.as_str()),
            data_type: if c.data_type.is_empty() {
                "NULL".to_string()
            } else {
                c.data_type
            },
            nullable: !c.not_null,
            default: c.default,
            comment: None,
            name: c.name,
        })
        .collect();

    Ok(TableSchema {
        name: table.to_string(),
        columns,
        primary_keys,
        foreign_keys: foreign_keys(conn, table)?,
    })
}

fn declares_autoincrement(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    let mut rows = stmt.query([table])?;
    Ok(match rows.next()? {
        Some(row) => row
            .get::<_, Option<String>>(0)?
            .is_some_and(|sql| sql.to_ascii_uppercase().contains("AUTOINCREMENT")),
        None => false,
    })
}

/// Primary key columns in key order, without touching foreign keys
fn primary_key_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk")?;
    let names = stmt
        .query_map([table], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

fn foreign_keys(conn: &Connection, table: &str) -> rusqlite::Result<Vec<ForeignKey>> {
    let mut stmt = conn.prepare(
        "SELECT id, \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
    )?;
    let rows = stmt
        .query_map([table], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut grouped: BTreeMap<i64, (String, Vec<String>, Vec<Option<String>>)> = BTreeMap::new();
    for (id, referenced_table, from, to) in rows {
        let entry = grouped
            .entry(id)
            .or_insert_with(|| (referenced_table, Vec::new(), Vec::new()));
        entry.1.push(from);
        entry.2.push(to);
    }

    let mut keys = Vec::with_capacity(grouped.len());
    for (referenced_table, columns, targets) in grouped.into_values() {
        // `REFERENCES parent` without columns points at the parent's primary key
        let referenced_columns = if targets.iter().all(Option::is_some) {
            targets.into_iter().flatten().collect()
        } else {
            primary_key_columns(conn, &referenced_table)?
        };
        keys.push(ForeignKey {
            columns,
            referenced_table,
            referenced_columns,
        });
    }

    Ok(keys)
}
