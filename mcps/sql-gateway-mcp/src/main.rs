//! SQL Gateway MCP Server
//!
//! Exposes table listing, schema description and SQL execution over stdio.
//! Configuration comes from `SQL_GATEWAY_CONFIG` / `~/.binks/sql-gateway.toml`
//! and the `DB_URL`, `EXECUTE_QUERY_MAX_CHARS` and `CLAUDE_LOCAL_FILES_PATH`
//! environment variables.

use sql_gateway_mcp::SqlGatewayServer;

mcp_common::serve_stdio!(SqlGatewayServer, "sql_gateway_mcp");
