//! MCP (Model Context Protocol) server exposing Babylon.js search tools.
//!
//! JSON-RPC 2.0 over newline-delimited stdio. Tools are registered against a
//! shared [`QueryEngine`](crate::search::QueryEngine) built once at startup.

#[cfg(test)]
mod tests;

pub mod errors;
pub mod formatters;
pub mod protocol;
pub mod server;
pub mod tools;

use std::sync::Arc;

use crate::search::QueryEngine;

pub use self::errors::McpError;
pub use self::server::{ConnectionState, McpServer, ToolHandler};

pub const SERVER_NAME: &str = "babylon-mcp";

pub const SERVER_INSTRUCTIONS: &str = "Babylon MCP Server provides access to Babylon.js documentation, API references, source code, and Editor documentation. Available tools:
- search_babylon_docs: Search documentation with optional category filtering
- get_babylon_doc: Retrieve full documentation page by path
- search_babylon_api: Search API documentation (classes, methods, properties)
- search_babylon_source: Search Babylon.js source code files with optional package filtering
- get_babylon_source: Retrieve source file content with optional line range
- search_babylon_editor_docs: Search Babylon.js Editor documentation for tool usage and workflows
This server helps reduce token usage by providing a canonical source for Babylon.js framework information.";

/// Build a server with every Babylon.js tool registered
#[inline]
pub async fn build_server(engine: Arc<QueryEngine>) -> McpServer {
    let server = McpServer::new(SERVER_NAME, env!("CARGO_PKG_VERSION"))
        .with_instructions(SERVER_INSTRUCTIONS);
    tools::register_all(&server, &engine).await;
    server
}
