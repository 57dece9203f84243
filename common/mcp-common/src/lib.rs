//! MCP Common - Shared utilities for MCP servers
//!
//! - **Initialization**: `serve_stdio!` macro, tracing setup and graceful
//!   shutdown on SIGINT/SIGTERM
//! - **Results**: text-only `CallToolResult` helpers
//! - **Errors**: the `Error: {message}` convention for tool failures
//! - **Embeddable**: [`EmbeddableMcp`] trait for in-process execution
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{error_text, serve_stdio, text_success};
//!
//! // In main.rs
//! serve_stdio!(MyServer, "my_mcp");
//!
//! // In tool implementations
//! async fn my_tool(&self) -> Result<CallToolResult, McpError> {
//!     Ok(text_success(match do_work().await {
//!         Ok(text) => text,
//!         Err(e) => error_text(&e),
//!     }))
//! }
//! ```

pub mod embeddable;
pub mod error;
pub mod init;
pub mod result;

// Re-export commonly used items at crate root
pub use embeddable::{EmbeddableError, EmbeddableMcp, EmbeddableResult};
pub use error::error_text;
pub use init::{init_tracing, shutdown_signal};
pub use result::{first_text, text_success};

// Re-export rmcp types that are commonly needed
pub use rmcp::{
    model::{CallToolResult, Content, Tool},
    ErrorData as McpError,
};

// Re-export async_trait for implementing EmbeddableMcp
pub use async_trait::async_trait;
