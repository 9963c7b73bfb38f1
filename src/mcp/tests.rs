//! Unit tests for the MCP protocol handling, formatters and tool handlers.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::errors::McpError;
use super::protocol::*;
use super::server::{ConnectionState, McpServer, ToolHandler};
use crate::search::{EngineSettings, QueryEngine};

fn uninitialized_engine() -> Arc<QueryEngine> {
    Arc::new(QueryEngine::new(EngineSettings {
        vector_path: PathBuf::from("/nonexistent/vectors"),
        docs_table: "babylon_docs".to_string(),
        api_table: "babylon_api".to_string(),
        source_table: "babylon_source_code".to_string(),
        source_repository: PathBuf::from("/nonexistent/Babylon.js"),
        document_sources: Vec::new(),
    }))
}

fn arguments(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

struct EchoHandler;

#[async_trait]
impl ToolHandler for EchoHandler {
    async fn handle(&self, arguments: Map<String, Value>) -> Result<CallToolResult, McpError> {
        let text = arguments
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(CallToolResult::text(text))
    }
}

fn echo_tool(name: &str) -> Tool {
    Tool {
        name: name.to_string(),
        description: "Echo the text argument".to_string(),
        input_schema: json!({"type": "object", "properties": {"text": {"type": "string"}}}),
    }
}

fn response_result(message: Option<JsonRpcMessage>) -> Value {
    match message {
        Some(JsonRpcMessage::Response(response)) => response.result,
        other => panic!("expected a response, got {:?}", other),
    }
}

fn error_code(message: Option<JsonRpcMessage>) -> i32 {
    match message {
        Some(JsonRpcMessage::ErrorResponse(response)) => response.error.code,
        other => panic!("expected an error response, got {:?}", other),
    }
}

mod protocol_tests {
    use super::*;

    #[test]
    fn version_negotiation_prefers_client_when_supported() {
        assert_eq!(negotiate_version("2024-11-05"), "2024-11-05");
        assert_eq!(negotiate_version("1999-01-01"), MCP_VERSION);
        assert_eq!(negotiate_version(""), MCP_VERSION);
    }

    #[test]
    fn notifications_parse_without_id() {
        let message: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"initialized"}"#)
                .expect("should parse notification");
        assert!(matches!(message, JsonRpcMessage::Notification(_)));

        let message: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"a1","method":"ping"}"#)
                .expect("should parse request");
        match message {
            JsonRpcMessage::Request(request) => {
                assert_eq!(request.id, RequestId::String("a1".to_string()));
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn tool_results_serialize_in_mcp_shape() {
        let value = serde_json::to_value(CallToolResult::error("boom")).expect("should serialize");
        assert_eq!(
            value,
            json!({"content": [{"type": "text", "text": "boom"}], "isError": true})
        );

        let value = serde_json::to_value(CallToolResult::text("ok")).expect("should serialize");
        assert!(value.get("isError").is_none());
    }
}

mod formatter_tests {
    use crate::mcp::formatters::*;

    #[test]
    fn relevance_is_a_one_decimal_percentage() {
        assert_eq!(relevance(0.873), "87.3%");
        assert_eq!(relevance(1.0), "100.0%");
        assert_eq!(relevance(0.0), "0.0%");
    }

    #[test]
    fn no_results_message_names_the_resource() {
        let result = no_results_response("scene rendering", "source code");
        assert_eq!(
            result.first_text(),
            Some(
                "No source code found for \"scene rendering\". Try different search terms or check if the source code has been indexed."
            )
        );
        assert_eq!(result.is_error, None);
    }

    #[test]
    fn not_found_message_appends_optional_info() {
        assert_eq!(
            not_found_response("/test/path", "Document", None).first_text(),
            Some("Document not found: /test/path.")
        );
        assert_eq!(
            not_found_response("scene.ts", "Source file", Some("The path may be incorrect."))
                .first_text(),
            Some("Source file not found: scene.ts. The path may be incorrect.")
        );
    }

    #[test]
    fn error_message_is_flagged() {
        let result = error_response(&"Test error message", "testing");
        assert_eq!(result.first_text(), Some("Error testing: Test error message"));
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn json_payload_is_pretty_printed() {
        let result = json_response(&serde_json::json!({"count": 2}));
        assert_eq!(result.first_text(), Some("{\n  \"count\": 2\n}"));
    }
}

mod server_tests {
    use super::*;

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let server = McpServer::new("babylon-mcp", "1.0.0").with_instructions("Use the tools");
        let reply = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"0"}}}"#,
            )
            .await;
        let result = response_result(reply);

        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "babylon-mcp");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(result["instructions"], "Use the tools");
        assert_eq!(server.connection_state().await, ConnectionState::Initializing);
    }

    #[tokio::test]
    async fn initialized_notification_gets_no_reply() {
        let server = McpServer::new("babylon-mcp", "1.0.0");
        let reply = server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(reply.is_none());
        assert_eq!(server.connection_state().await, ConnectionState::Ready);
    }

    #[tokio::test]
    async fn malformed_input_is_rejected() {
        let server = McpServer::new("babylon-mcp", "1.0.0");
        assert_eq!(
            error_code(server.handle_line("{not json").await),
            error_codes::PARSE_ERROR
        );
        assert_eq!(
            error_code(server.handle_line(r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#).await),
            error_codes::INVALID_REQUEST
        );
        assert_eq!(
            error_code(server.handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"prompts/list"}"#).await),
            error_codes::METHOD_NOT_FOUND
        );
    }

    #[tokio::test]
    async fn ping_answers_empty_object() {
        let server = McpServer::new("babylon-mcp", "1.0.0");
        let result = response_result(
            server
                .handle_line(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#)
                .await,
        );
        assert_eq!(result, json!({}));
    }

    #[tokio::test]
    async fn tools_are_listed_in_registration_order_and_called() {
        let server = McpServer::new("babylon-mcp", "1.0.0");
        server.register_tool(echo_tool("zeta"), EchoHandler).await;
        server.register_tool(echo_tool("alpha"), EchoHandler).await;
        server.register_tool(echo_tool("zeta"), EchoHandler).await;
        assert_eq!(server.tool_names().await, vec!["alpha", "zeta"]);

        let listed = response_result(
            server
                .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
                .await,
        );
        assert_eq!(listed["tools"][0]["name"], "alpha");
        assert!(listed["tools"][0]["inputSchema"].is_object());

        let called = response_result(
            server
                .handle_line(
                    r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"alpha","arguments":{"text":"hello"}}}"#,
                )
                .await,
        );
        assert_eq!(called["content"][0]["text"], "hello");
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let server = McpServer::new("babylon-mcp", "1.0.0");
        let reply = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"nope"}}"#,
            )
            .await;
        assert_eq!(error_code(reply), error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn serve_answers_each_request_line() {
        let server = McpServer::new("babylon-mcp", "1.0.0");
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n"
        );
        let mut output = Vec::new();
        server
            .serve(input.as_bytes(), &mut output)
            .await
            .expect("should serve");

        let output = String::from_utf8(output).expect("should be utf-8");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: Value = serde_json::from_str(lines[1]).expect("should be json");
        assert_eq!(second["id"], 2);
        assert_eq!(server.connection_state().await, ConnectionState::Closed);
    }
}

mod tool_tests {
    use super::*;
    use crate::mcp::tools::*;

    #[test]
    fn tool_definitions_require_their_key_argument() {
        let cases = [
            (SearchDocsHandler::tool_definition(), "query"),
            (GetDocHandler::tool_definition(), "path"),
            (SearchApiHandler::tool_definition(), "query"),
            (SearchSourceHandler::tool_definition(), "query"),
            (GetSourceHandler::tool_definition(), "filePath"),
            (SearchEditorDocsHandler::tool_definition(), "query"),
        ];
        for (tool, required) in cases {
            assert_eq!(tool.input_schema["required"], json!([required]), "{}", tool.name);
            assert!(tool.input_schema["properties"][required].is_object());
        }
    }

    #[test]
    fn editor_options_prefix_category_or_overfetch() {
        let with_category = editor_search_options(Some("scripting"), 5);
        assert_eq!(with_category.category.as_deref(), Some("editor/scripting"));
        assert_eq!(with_category.limit, 5);

        let without = editor_search_options(None, 4);
        assert_eq!(without.category, None);
        assert_eq!(without.limit, 12);
    }

    #[tokio::test]
    async fn build_server_registers_all_tools() {
        let server = crate::mcp::build_server(uninitialized_engine()).await;
        assert_eq!(
            server.tool_names().await,
            vec![
                "search_babylon_docs",
                "get_babylon_doc",
                "search_babylon_api",
                "search_babylon_source",
                "get_babylon_source",
                "search_babylon_editor_docs",
            ]
        );
    }

    #[tokio::test]
    async fn missing_query_is_an_argument_error() {
        let handler = SearchDocsHandler::new(uninitialized_engine());
        let result = handler.handle(arguments(json!({"limit": 3}))).await;
        assert!(matches!(result, Err(McpError::InvalidToolArguments { .. })));
    }

    #[tokio::test]
    async fn engine_failures_become_tool_errors() {
        let engine = uninitialized_engine();

        let docs = SearchDocsHandler::new(Arc::clone(&engine))
            .handle(arguments(json!({"query": "materials"})))
            .await
            .expect("should produce a tool result");
        assert_eq!(docs.is_error, Some(true));
        assert!(
            docs.first_text()
                .is_some_and(|text| text.starts_with("Error searching documentation:"))
        );

        let api = SearchApiHandler::new(Arc::clone(&engine))
            .handle(arguments(json!({"query": "Vector3"})))
            .await
            .expect("should produce a tool result");
        assert!(
            api.first_text()
                .is_some_and(|text| text.starts_with("Error searching API documentation:"))
        );

        let doc = GetDocHandler::new(engine)
            .handle(arguments(json!({"path": "features/materials"})))
            .await
            .expect("should produce a tool result");
        assert!(
            doc.first_text()
                .is_some_and(|text| text.starts_with("Error retrieving document:"))
        );
    }

    #[tokio::test]
    async fn missing_source_file_is_not_found() {
        let handler = GetSourceHandler::new(uninitialized_engine());
        let result = handler
            .handle(arguments(json!({"filePath": "packages/dev/core/src/missing.ts"})))
            .await
            .expect("should produce a tool result");
        assert_eq!(
            result.first_text(),
            Some(
                "Source file not found: packages/dev/core/src/missing.ts. The path may be incorrect or the file does not exist in the repository."
            )
        );
        assert_eq!(result.is_error, None);
    }
}
