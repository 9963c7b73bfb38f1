//! Failures surfaced to MCP clients as JSON-RPC errors.
//!
//! Failures inside a tool (search errors, missing indexes) are not errors at
//! this level: they become tool results flagged with `isError`.

use thiserror::Error;

use crate::DocsError;
use crate::mcp::protocol::{JsonRpcError, error_codes};

#[derive(Error, Debug)]
pub enum McpError {
    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },

    #[error("Unknown tool: {name}")]
    ToolNotFound { name: String },

    #[error("Invalid arguments for tool {tool}: {message}")]
    InvalidToolArguments { tool: String, message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl McpError {
    #[inline]
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError { .. } => error_codes::PARSE_ERROR,
            Self::InvalidRequest { .. } => error_codes::INVALID_REQUEST,
            Self::MethodNotFound { .. } => error_codes::METHOD_NOT_FOUND,
            Self::InvalidParameters { .. }
            | Self::ToolNotFound { .. }
            | Self::InvalidToolArguments { .. } => error_codes::INVALID_PARAMS,
            Self::InternalError { .. } => error_codes::INTERNAL_ERROR,
        }
    }

    #[inline]
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        JsonRpcError::new(self.code(), self.to_string())
    }
}

impl From<serde_json::Error> for McpError {
    #[inline]
    fn from(e: serde_json::Error) -> Self {
        Self::InternalError {
            message: format!("Failed to serialize response: {}", e),
        }
    }
}

impl From<McpError> for DocsError {
    #[inline]
    fn from(e: McpError) -> Self {
        DocsError::Mcp(e.to_string())
    }
}
