//! SQL Gateway MCP Server implementation

use mcp_common::{
    async_trait, error_text, text_success, EmbeddableError, EmbeddableMcp, EmbeddableResult,
    McpError,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo, Tool},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::GatewayConfig;
use crate::gateway::QueryGateway;
use crate::schema::describe_tables;

const SERVER_DESCRIPTION: &str = "SQL gateway MCP server - lists tables, describes schemas and \
     relationships, and runs SQL with size-bounded, readable results.";

// ============================================================================
// Parameter Types
// ============================================================================

/// Parameters for filter_table_names tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct FilterTablesParams {
    /// Substring to look for in table names (case-sensitive)
    pub q: String,
}

/// Parameters for schema_definitions tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SchemaParams {
    /// Tables to describe, in the order they should be reported
    pub table_names: Vec<String>,
}

/// Parameters for execute_query tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryParams {
    /// SQL statement to execute. Use :name placeholders for parameters.
    pub query: String,

    /// Optional named parameters, e.g. {"user_id": 42}
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
}

// ============================================================================
// Server Implementation
// ============================================================================

/// SQL Gateway MCP Server
#[derive(Clone)]
pub struct SqlGatewayServer {
    gateway: QueryGateway,
    tool_router: ToolRouter<Self>,
}

impl SqlGatewayServer {
    /// Create a server for the given configuration
    pub fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
        let gateway = QueryGateway::from_config(config)?;
        tracing::info!("{}", gateway.database().describe_connection());

        Ok(Self {
            gateway,
            tool_router: Self::tool_router(),
        })
    }

    /// Create a server from the config file and environment
    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(&GatewayConfig::load()?)
    }

    fn instructions(&self) -> String {
        let mut parts = vec![
            SERVER_DESCRIPTION.to_string(),
            "Use all_table_names or filter_table_names to find tables, schema_definitions \
             to inspect columns and relationships, and execute_query to run SQL."
                .to_string(),
            format!(
                "Query results are truncated after {} characters.",
                self.gateway.max_response_chars()
            ),
        ];
        if self.gateway.offers_full_results() {
            parts.push(
                "The full result set of every query is also published at a URL that can be \
                 fetched for analysis and artifacts."
                    .to_string(),
            );
        }
        parts.push(self.gateway.database().describe_connection());
        parts.join(" ")
    }
}

#[tool_router]
impl SqlGatewayServer {
    /// List every table
    #[tool(description = "Return all table names in the database separated by comma.")]
    async fn all_table_names(&self) -> Result<CallToolResult, McpError> {
        let text = match self.gateway.database().table_names().await {
            Ok(names) => names.join(", "),
            Err(e) => {
                tracing::error!(error = %e, "Failed to list tables");
                error_text(&e)
            }
        };
        Ok(text_success(text))
    }

    /// List tables whose name contains a substring
    #[tool(description = "Return all table names in the database containing the substring 'q' separated by comma.")]
    async fn filter_table_names(
        &self,
        Parameters(params): Parameters<FilterTablesParams>,
    ) -> Result<CallToolResult, McpError> {
        let text = match self.gateway.database().table_names().await {
            Ok(names) => names
                .into_iter()
                .filter(|name| name.contains(&params.q))
                .collect::<Vec<_>>()
                .join(", "),
            Err(e) => {
                tracing::error!(error = %e, "Failed to list tables");
                error_text(&e)
            }
        };
        Ok(text_success(text))
    }

    /// Describe columns, keys and relationships
    #[tool(description = "Returns schema and relation information for the given tables.")]
    async fn schema_definitions(
        &self,
        Parameters(params): Parameters<SchemaParams>,
    ) -> Result<CallToolResult, McpError> {
        let text = match self.gateway.database().inspect_tables(&params.table_names).await {
            Ok(tables) => describe_tables(&tables),
            Err(e) => {
                tracing::error!(error = %e, tables = ?params.table_names, "Failed to inspect tables");
                error_text(&e)
            }
        };
        Ok(text_success(text))
    }

    /// Run arbitrary SQL
    #[tool(description = "Execute a SQL query and return results in a readable format. Results are truncated after the server's character budget; when full-result publishing is enabled, a URL to the complete result set is appended.")]
    async fn execute_query(
        &self,
        Parameters(params): Parameters<QueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .gateway
            .execute(&params.query, params.params.as_ref())
            .await;
        Ok(text_success(text))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for SqlGatewayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(self.instructions()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ============================================================================
// EmbeddableMcp Implementation
// ============================================================================

#[async_trait]
impl EmbeddableMcp for SqlGatewayServer {
    fn server_name(&self) -> &str {
        "sql-gateway"
    }

    fn server_description(&self) -> Option<&str> {
        Some(SERVER_DESCRIPTION)
    }

    fn list_tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult> {
        match name {
            "all_table_names" => self.all_table_names().await.map_err(Into::into),

            "filter_table_names" => {
                let params: FilterTablesParams = serde_json::from_value(params)?;
                self.filter_table_names(Parameters(params))
                    .await
                    .map_err(Into::into)
            }

            "schema_definitions" => {
                let params: SchemaParams = serde_json::from_value(params)?;
                self.schema_definitions(Parameters(params))
                    .await
                    .map_err(Into::into)
            }

            "execute_query" => {
                let params: QueryParams = serde_json::from_value(params)?;
                self.execute_query(Parameters(params)).await.map_err(Into::into)
            }

            _ => Err(EmbeddableError::ToolNotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn server(dir: &std::path::Path, extra: &[(&str, String)]) -> SqlGatewayServer {
        let db_url = format!("sqlite:///{}", dir.join("app.db").display());
        let config = GatewayConfig::from_sources(None, |key| {
            if key == "DB_URL" {
                return Some(db_url.clone());
            }
            extra.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
        })
        .unwrap();
        SqlGatewayServer::new(&config).unwrap()
    }

    #[test]
    fn test_embeddable_list_tools() {
        let dir = tempdir().unwrap();
        let server = server(dir.path(), &[]);
        assert_eq!(server.server_name(), "sql-gateway");

        let tools = server.list_tools();
        let mut names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "all_table_names",
                "execute_query",
                "filter_table_names",
                "schema_definitions"
            ]
        );
    }

    #[test]
    fn test_instructions_reflect_config() {
        let dir = tempdir().unwrap();
        let plain = server(dir.path(), &[("EXECUTE_QUERY_MAX_CHARS", "1500".into())]);
        let info = rmcp::ServerHandler::get_info(&plain);
        let instructions = info.instructions.unwrap();
        assert!(instructions.contains("truncated after 1500 characters"));
        assert!(instructions.contains("Connected to sqlite version"));
        assert!(!instructions.contains("published at a URL"));

        let files = dir.path().display().to_string();
        let offloading = server(dir.path(), &[("CLAUDE_LOCAL_FILES_PATH", files)]);
        assert!(offloading.instructions().contains("published at a URL"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let dir = tempdir().unwrap();
        let server = server(dir.path(), &[]);
        let result = server.call_tool("drop_everything", serde_json::json!({})).await;
        assert!(matches!(result, Err(EmbeddableError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_required_param() {
        let dir = tempdir().unwrap();
        let server = server(dir.path(), &[]);
        let result = server.call_tool("execute_query", serde_json::json!({})).await;
        assert!(matches!(result, Err(EmbeddableError::InvalidParams(_))));
    }
}
