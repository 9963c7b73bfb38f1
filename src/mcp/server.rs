//! MCP server: tool registry, request routing and the newline-delimited
//! stdio transport.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::mcp::errors::McpError;
use crate::mcp::protocol::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

/// Executes one tool; arguments arrive as the raw `arguments` object
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, arguments: Map<String, Value>) -> Result<CallToolResult, McpError>;
}

pub struct McpServer {
    server_info: Implementation,
    instructions: Option<String>,
    /// Registration order is the order reported by `tools/list`
    tools: RwLock<Vec<Tool>>,
    handlers: RwLock<HashMap<String, Arc<dyn ToolHandler>>>,
    connection_state: RwLock<ConnectionState>,
}

impl McpServer {
    #[inline]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            server_info: Implementation {
                name: name.into(),
                version: version.into(),
            },
            instructions: None,
            tools: RwLock::new(Vec::new()),
            handlers: RwLock::new(HashMap::new()),
            connection_state: RwLock::new(ConnectionState::Uninitialized),
        }
    }

    #[inline]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    #[inline]
    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    /// Register a tool, replacing any earlier tool with the same name
    #[inline]
    pub async fn register_tool<H>(&self, tool: Tool, handler: H)
    where
        H: ToolHandler + 'static,
    {
        let name = tool.name.clone();
        {
            let mut tools = self.tools.write().await;
            tools.retain(|existing| existing.name != name);
            tools.push(tool);
        }
        self.handlers
            .write()
            .await
            .insert(name.clone(), Arc::new(handler));
        debug!("Registered tool: {}", name);
    }

    #[inline]
    pub async fn tool_names(&self) -> Vec<String> {
        self.tools
            .read()
            .await
            .iter()
            .map(|tool| tool.name.clone())
            .collect()
    }

    #[inline]
    pub async fn connection_state(&self) -> ConnectionState {
        *self.connection_state.read().await
    }

    /// Serve on the process stdin/stdout until stdin closes
    #[inline]
    pub async fn serve_stdio(&self) -> crate::Result<()> {
        info!("Starting MCP server with stdio transport");
        self.serve(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Serve newline-delimited JSON-RPC from `reader`, answering on `writer`
    #[inline]
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> crate::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();
        loop {
            line.clear();
            let read = match reader.read_line(&mut line).await {
                Ok(read) => read,
                Err(e) => {
                    error!("Error reading from client: {}", e);
                    break;
                }
            };
            if read == 0 {
                info!("EOF reached, closing connection");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(reply) = self.handle_line(trimmed).await {
                write_message(&mut writer, &reply).await?;
            }
        }

        *self.connection_state.write().await = ConnectionState::Closed;
        info!("MCP server stopped");
        Ok(())
    }

    /// Handle one raw line; `None` when nothing must be sent back
    #[inline]
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcMessage> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to parse JSON: {}", e);
                let error = McpError::ParseError {
                    message: e.to_string(),
                };
                return Some(error_message(&error, None));
            }
        };

        match parse_message(raw) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => {
                warn!("Rejected message: {}", e);
                Some(error_message(&e, None))
            }
        }
    }

    #[inline]
    pub async fn handle_message(&self, message: JsonRpcMessage) -> Option<JsonRpcMessage> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(&notification).await;
                None
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {
                warn!("Received unexpected response message from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        debug!("Request {:?}: {}", request.id, request.method);
        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_call_tool(request.params).await,
            "ping" => Ok(json!({})),
            other => Err(McpError::MethodNotFound {
                method: other.to_string(),
            }),
        };

        match result {
            Ok(result) => JsonRpcMessage::Response(JsonRpcResponse::new(result, request.id)),
            Err(e) => {
                error!("Error handling request {}: {}", request.method, e);
                error_message(&e, Some(request.id))
            }
        }
    }

    async fn handle_notification(&self, notification: &JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                *self.connection_state.write().await = ConnectionState::Ready;
                info!("Server ready to handle requests");
            }
            "notifications/cancelled" => debug!("Received cancellation notification"),
            other => warn!("Unknown notification method: {}", other),
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: InitializeParams = match params {
            Some(params) => {
                serde_json::from_value(params).map_err(|e| McpError::InvalidParameters {
                    message: e.to_string(),
                })?
            }
            None => InitializeParams::default(),
        };

        *self.connection_state.write().await = ConnectionState::Initializing;
        let client = params
            .client_info
            .as_ref()
            .map_or("unknown client", |info| info.name.as_str());
        info!(
            "Client initialized: {} (protocol {})",
            client, params.protocol_version
        );

        let result = InitializeResult {
            protocol_version: negotiate_version(&params.protocol_version).to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: self.server_info.clone(),
            instructions: self.instructions.clone(),
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn handle_list_tools(&self) -> Result<Value, McpError> {
        let tools = self.tools.read().await.clone();
        Ok(serde_json::to_value(ListToolsResult { tools })?)
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: CallToolParams = params
            .ok_or_else(|| McpError::InvalidParameters {
                message: "Tool call request missing parameters".to_string(),
            })
            .and_then(|params| {
                serde_json::from_value(params).map_err(|e| McpError::InvalidParameters {
                    message: e.to_string(),
                })
            })?;

        // Clone the handler out so the registry lock is not held while it runs
        let handler = self
            .handlers
            .read()
            .await
            .get(&params.name)
            .map(Arc::clone)
            .ok_or_else(|| McpError::ToolNotFound {
                name: params.name.clone(),
            })?;

        let result = handler.handle(params.arguments.unwrap_or_default()).await?;
        Ok(serde_json::to_value(result)?)
    }
}

fn parse_message(raw: Value) -> Result<JsonRpcMessage, McpError> {
    let version = raw.get("jsonrpc").and_then(Value::as_str);
    if version != Some(JSONRPC_VERSION) {
        return Err(McpError::InvalidRequest {
            message: format!("jsonrpc must be \"{}\"", JSONRPC_VERSION),
        });
    }
    serde_json::from_value(raw).map_err(|e| McpError::InvalidRequest {
        message: e.to_string(),
    })
}

fn error_message(error: &McpError, id: Option<RequestId>) -> JsonRpcMessage {
    JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(error.to_jsonrpc_error(), id))
}

async fn write_message<W>(writer: &mut W, message: &JsonRpcMessage) -> crate::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(message)
        .map_err(|e| crate::DocsError::Mcp(format!("Failed to serialize message: {}", e)))?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
