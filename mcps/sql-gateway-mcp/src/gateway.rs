//! Query orchestration: run a statement and assemble the response text

use serde_json::Map;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::database::{QueryOutcome, ResultSet, SqliteDatabase};
use crate::overflow::{DirectorySink, OverflowStore};
use crate::render::render_rows;

/// Response for a query that returned a result set with no rows
pub const NO_ROWS: &str = "No rows returned";

/// Runs statements and turns their outcome into a single text response
#[derive(Clone)]
pub struct QueryGateway {
    database: SqliteDatabase,
    max_response_chars: usize,
    overflow: Option<OverflowStore>,
}

impl QueryGateway {
    pub fn new(
        database: SqliteDatabase,
        max_response_chars: usize,
        overflow: Option<OverflowStore>,
    ) -> Self {
        Self {
            database,
            max_response_chars,
            overflow,
        }
    }

    /// Build the gateway described by `config`
    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let database = SqliteDatabase::from_url(
            config.database_url()?,
            Duration::from_secs(config.database.busy_timeout_secs),
            config.database.read_only,
        )?;

        let overflow = config.overflow.directory.as_ref().map(|dir| {
            OverflowStore::new(
                Arc::new(DirectorySink::new(dir.clone())),
                config.overflow.base_url.clone(),
            )
        });

        Ok(Self::new(database, config.output.max_response_chars, overflow))
    }

    pub fn database(&self) -> &SqliteDatabase {
        &self.database
    }

    pub fn max_response_chars(&self) -> usize {
        self.max_response_chars
    }

    /// Whether responses link to a complete copy of the rows
    pub fn offers_full_results(&self) -> bool {
        self.overflow.is_some()
    }

    /// Execute a statement and describe the outcome
    ///
    /// Always produces text; failures come back as `Error: {message}`.
    pub async fn execute(&self, statement: &str, params: Option<&Map<String, serde_json::Value>>) -> String {
        let empty = Map::new();
        let params = params.unwrap_or(&empty);

        tracing::info!(query = %statement, "Executing query");
        if !params.is_empty() {
            tracing::info!(params = ?params, "With parameters");
        }

        match self.database.execute(statement, params).await {
            Ok(QueryOutcome::Affected(count)) => {
                let message = format!("Success: {} rows affected", count);
                tracing::info!("{}", message);
                message
            }
            Ok(QueryOutcome::Rows(result)) => self.respond_with_rows(&result).await,
            Err(e) => {
                tracing::error!(error = %e, "Error executing query");
                mcp_common::error_text(&e)
            }
        }
    }

    /// Render a result set, add the summary line and the artifact note
    pub async fn respond_with_rows(&self, result: &ResultSet) -> String {
        if result.rows.is_empty() {
            return NO_ROWS.to_string();
        }

        let columns = result.column_names();
        let rendered = render_rows(
            &columns,
            result.rows.iter().map(Vec::as_slice),
            self.max_response_chars,
        );

        let mut output = rendered.text;
        output.push_str(&format!("\nResult: {} rows", result.rows.len()));
        if rendered.truncated {
            output.push_str(" (output truncated)");
        }

        if let Some(store) = &self.overflow {
            // The inline result stands even when the artifact can't be written
            match store.store(&columns, &result.rows).await {
                Ok(artifact) => output.push_str(&artifact.note()),
                Err(e) => tracing::warn!(
                    error = %e,
                    "Failed to store full result set, returning inline rows only"
                ),
            }
        }

        output
    }
}
