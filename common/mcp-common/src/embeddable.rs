//! In-process tool execution
//!
//! [`EmbeddableMcp`] lets a host (or a test) call a server's tools directly,
//! without spawning the server binary and speaking MCP over stdio.
//!
//! ```rust,ignore
//! use mcp_common::EmbeddableMcp;
//! use sql_gateway_mcp::SqlGatewayServer;
//!
//! let server = SqlGatewayServer::new(&config)?;
//! let result = server
//!     .call_tool("execute_query", serde_json::json!({ "query": "SELECT 1" }))
//!     .await?;
//! ```

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Tool};
use serde_json::Value;

/// Error type for embedded tool calls
#[derive(Debug, thiserror::Error)]
pub enum EmbeddableError {
    /// No tool with that name
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Parameters did not match the tool's input type
    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] serde_json::Error),

    /// The tool returned a protocol-level error
    #[error("mcp error: {0}")]
    McpError(String),
}

impl From<rmcp::ErrorData> for EmbeddableError {
    fn from(err: rmcp::ErrorData) -> Self {
        EmbeddableError::McpError(err.message.to_string())
    }
}

/// Result type for embedded tool calls
pub type EmbeddableResult<T> = Result<T, EmbeddableError>;

/// MCP server that can be driven in-process
///
/// Implementations must be `Send + Sync`; tool calls may arrive from
/// several tasks at once.
#[async_trait]
pub trait EmbeddableMcp: Send + Sync {
    /// Name used for the server in MCP configuration files
    fn server_name(&self) -> &str;

    /// All tools with their descriptions and input schemas
    fn list_tools(&self) -> Vec<Tool>;

    /// Call a tool by name with JSON object parameters
    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult>;

    /// Optional human-readable description
    fn server_description(&self) -> Option<&str> {
        None
    }
}
