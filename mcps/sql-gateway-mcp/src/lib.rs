//! SQL Gateway MCP Library
//!
//! Runs ad-hoc SQL and schema introspection against a configured database
//! and answers with bounded, readable text. Complete result sets can be
//! published as content-addressed JSON files for out-of-band retrieval.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use sql_gateway_mcp::{GatewayConfig, SqlGatewayServer};
//!
//! let config = GatewayConfig::load()?;
//! let server = SqlGatewayServer::new(&config)?;
//! // Use with in-memory transport or serve via stdio
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod overflow;
pub mod render;
pub mod schema;
pub mod server;
pub mod value;

// Re-export main server type
pub use server::SqlGatewayServer;

// Re-export parameter types for direct API usage
pub use server::{FilterTablesParams, QueryParams, SchemaParams};

pub use config::GatewayConfig;
pub use error::{ExecutionError, IntrospectionError, OverflowWriteError};
pub use gateway::QueryGateway;
pub use overflow::{DirectorySink, OverflowArtifact, OverflowSink, OverflowStore};
pub use render::{render_rows, RenderedResult};
pub use schema::{describe_tables, ColumnSchema, ForeignKey, TableSchema};
pub use value::{format_value, SqlValue};
