//! The six Babylon.js tools served over MCP.
//!
//! Each handler parses its arguments, runs one query against the shared
//! [`QueryEngine`] and formats the outcome. Query failures are reported as
//! tool results flagged with `isError`, not as protocol errors.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, error};

use crate::mcp::errors::McpError;
use crate::mcp::formatters::{
    error_response, json_response, no_results_response, not_found_response, relevance,
};
use crate::mcp::protocol::{CallToolResult, Tool};
use crate::mcp::server::{McpServer, ToolHandler};
use crate::records::{SearchResult, truncate_chars};
use crate::search::{DEFAULT_LIMIT, QueryEngine, SearchOptions, SourceSearchOptions};

/// Source name of documents indexed from the editor documentation
pub const EDITOR_SOURCE: &str = "editor-docs";
/// Over-fetch factor for editor searches without a category
const EDITOR_OVERFETCH: usize = 3;
/// Characters of a source chunk shown in search results
const SOURCE_SNIPPET_CHARS: usize = 500;

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: Map<String, Value>) -> Result<T, McpError> {
    serde_json::from_value(Value::Object(arguments)).map_err(|e| McpError::InvalidToolArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn limit_schema() -> Value {
    json!({
        "type": "number",
        "description": "Maximum number of results to return (default: 5)",
        "default": DEFAULT_LIMIT
    })
}

fn ranked_documents(results: &[SearchResult]) -> Vec<Value> {
    results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            json!({
                "rank": index + 1,
                "title": result.title,
                "description": result.description,
                "url": result.url,
                "category": result.category,
                "relevance": relevance(result.score),
                "snippet": result.content,
                "keywords": result.keywords,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct SearchDocsArgs {
    query: String,
    category: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
}

pub struct SearchDocsHandler {
    engine: Arc<QueryEngine>,
}

impl SearchDocsHandler {
    pub const NAME: &'static str = "search_babylon_docs";

    #[inline]
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: Self::NAME.to_string(),
            description: "Search Babylon.js documentation for API references, guides, and tutorials"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query for Babylon.js documentation"
                    },
                    "category": {
                        "type": "string",
                        "description": "Optional category filter (e.g., \"api\", \"tutorial\", \"guide\")"
                    },
                    "limit": limit_schema()
                },
                "required": ["query"]
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for SearchDocsHandler {
    #[inline]
    async fn handle(&self, arguments: Map<String, Value>) -> Result<CallToolResult, McpError> {
        let args: SearchDocsArgs = parse_arguments(Self::NAME, arguments)?;
        debug!("Searching docs: {:?}", args);

        let options = SearchOptions {
            limit: args.limit,
            category: args.category,
        };
        let results = match self.engine.search(&args.query, &options).await {
            Ok(results) => results,
            Err(e) => {
                error!("Error searching documentation: {}", e);
                return Ok(error_response(&e, "searching documentation"));
            }
        };

        if results.is_empty() {
            return Ok(no_results_response(&args.query, "documentation"));
        }
        Ok(json_response(&json!({
            "query": args.query,
            "totalResults": results.len(),
            "results": ranked_documents(&results),
        })))
    }
}

#[derive(Debug, Deserialize)]
struct GetDocArgs {
    path: String,
}

pub struct GetDocHandler {
    engine: Arc<QueryEngine>,
}

impl GetDocHandler {
    pub const NAME: &'static str = "get_babylon_doc";

    #[inline]
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: Self::NAME.to_string(),
            description: "Retrieve full content of a specific Babylon.js documentation page"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Documentation file path or topic identifier"
                    }
                },
                "required": ["path"]
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for GetDocHandler {
    #[inline]
    async fn handle(&self, arguments: Map<String, Value>) -> Result<CallToolResult, McpError> {
        let args: GetDocArgs = parse_arguments(Self::NAME, arguments)?;

        let document = match self.engine.get_document_by_path(&args.path).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                return Ok(not_found_response(
                    &args.path,
                    "Document",
                    Some("The path may be incorrect or the documentation has not been indexed."),
                ));
            }
            Err(e) => {
                error!("Error retrieving document {}: {}", args.path, e);
                return Ok(error_response(&e, "retrieving document"));
            }
        };

        Ok(json_response(&json!({
            "title": document.title,
            "description": document.description,
            "url": document.url,
            "category": document.category,
            "breadcrumbs": document.breadcrumb_list(),
            "content": document.content,
            "headings": document.heading_list(),
            "keywords": document.keyword_list(),
            "playgroundIds": document.playground_id_list(),
            "lastModified": document.last_modified,
        })))
    }
}

#[derive(Debug, Deserialize)]
struct SearchApiArgs {
    query: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

pub struct SearchApiHandler {
    engine: Arc<QueryEngine>,
}

impl SearchApiHandler {
    pub const NAME: &'static str = "search_babylon_api";

    #[inline]
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: Self::NAME.to_string(),
            description: "Search Babylon.js API documentation (classes, methods, properties)"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query for Babylon.js API (e.g., \"getMeshByName\", \"Vector3\", \"Scene\")"
                    },
                    "limit": limit_schema()
                },
                "required": ["query"]
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for SearchApiHandler {
    #[inline]
    async fn handle(&self, arguments: Map<String, Value>) -> Result<CallToolResult, McpError> {
        let args: SearchApiArgs = parse_arguments(Self::NAME, arguments)?;

        let results = match self.engine.search_api(&args.query, args.limit).await {
            Ok(results) => results,
            Err(e) => {
                error!("Error searching API documentation: {}", e);
                return Ok(error_response(&e, "searching API documentation"));
            }
        };

        if results.is_empty() {
            return Ok(no_results_response(&args.query, "API documentation"));
        }

        let formatted: Vec<Value> = results
            .iter()
            .enumerate()
            .map(|(index, hit)| {
                let entry = &hit.record;
                json!({
                    "rank": index + 1,
                    "name": entry.name,
                    "fullName": entry.full_name,
                    "kind": entry.kind,
                    "summary": entry.summary,
                    "description": entry.description,
                    "parameters": entry.parameter_list(),
                    "returns": entry.return_value(),
                    "type": entry.type_name,
                    "examples": entry.examples,
                    "deprecated": entry.deprecated,
                    "see": entry.see,
                    "since": entry.since,
                    "sourceFile": entry.source_file,
                    "sourceLine": entry.source_line,
                    "url": entry.url,
                    "relevance": relevance(hit.score),
                })
            })
            .collect();

        Ok(json_response(&json!({
            "query": args.query,
            "totalResults": results.len(),
            "results": formatted,
        })))
    }
}

#[derive(Debug, Deserialize)]
struct SearchSourceArgs {
    query: String,
    package: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
}

pub struct SearchSourceHandler {
    engine: Arc<QueryEngine>,
}

impl SearchSourceHandler {
    pub const NAME: &'static str = "search_babylon_source";

    #[inline]
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: Self::NAME.to_string(),
            description: "Search Babylon.js source code files".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query for source code (e.g., \"getMeshByName implementation\", \"scene rendering\")"
                    },
                    "package": {
                        "type": "string",
                        "description": "Optional package filter (e.g., \"core\", \"gui\", \"materials\")"
                    },
                    "limit": limit_schema()
                },
                "required": ["query"]
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for SearchSourceHandler {
    #[inline]
    async fn handle(&self, arguments: Map<String, Value>) -> Result<CallToolResult, McpError> {
        let args: SearchSourceArgs = parse_arguments(Self::NAME, arguments)?;

        let options = SourceSearchOptions {
            package: args.package,
            limit: args.limit,
            table_name: None,
        };
        let results = match self.engine.search_source_code(&args.query, &options).await {
            Ok(results) => results,
            Err(e) => {
                error!("Error searching source code: {}", e);
                return Ok(error_response(&e, "searching source code"));
            }
        };

        if results.is_empty() {
            return Ok(no_results_response(&args.query, "source code"));
        }

        let formatted: Vec<Value> = results
            .iter()
            .enumerate()
            .map(|(index, hit)| {
                let chunk = &hit.record;
                json!({
                    "rank": index + 1,
                    "filePath": chunk.file_path,
                    "package": chunk.package,
                    "startLine": chunk.start_line,
                    "endLine": chunk.end_line,
                    "language": chunk.language,
                    "codeSnippet": truncate_chars(&chunk.content, SOURCE_SNIPPET_CHARS),
                    "imports": chunk.imports,
                    "exports": chunk.exports,
                    "url": chunk.url,
                    "relevance": relevance(hit.score),
                })
            })
            .collect();

        Ok(json_response(&json!({
            "query": args.query,
            "totalResults": results.len(),
            "results": formatted,
        })))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetSourceArgs {
    file_path: String,
    start_line: Option<usize>,
    end_line: Option<usize>,
}

pub struct GetSourceHandler {
    engine: Arc<QueryEngine>,
}

impl GetSourceHandler {
    pub const NAME: &'static str = "get_babylon_source";

    #[inline]
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: Self::NAME.to_string(),
            description: "Retrieve full Babylon.js source code file or specific line range"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filePath": {
                        "type": "string",
                        "description": "Relative file path from repository root (e.g., \"packages/dev/core/src/scene.ts\")"
                    },
                    "startLine": {
                        "type": "number",
                        "description": "Optional start line number (1-indexed)"
                    },
                    "endLine": {
                        "type": "number",
                        "description": "Optional end line number (1-indexed)"
                    }
                },
                "required": ["filePath"]
            }),
        }
    }
}

fn file_language(path: &str) -> &'static str {
    if path.ends_with(".ts") || path.ends_with(".tsx") {
        "typescript"
    } else {
        "javascript"
    }
}

#[async_trait]
impl ToolHandler for GetSourceHandler {
    #[inline]
    async fn handle(&self, arguments: Map<String, Value>) -> Result<CallToolResult, McpError> {
        let args: GetSourceArgs = parse_arguments(Self::NAME, arguments)?;

        let source = match self
            .engine
            .get_source_file(&args.file_path, args.start_line, args.end_line)
            .await
        {
            Ok(Some(source)) if !source.is_empty() => source,
            Ok(_) => {
                return Ok(not_found_response(
                    &args.file_path,
                    "Source file",
                    Some("The path may be incorrect or the file does not exist in the repository."),
                ));
            }
            Err(e) => {
                error!("Error retrieving source file {}: {}", args.file_path, e);
                return Ok(error_response(&e, "retrieving source file"));
            }
        };

        let total_lines = source.split('\n').count();
        Ok(json_response(&json!({
            "filePath": args.file_path,
            "startLine": args.start_line.filter(|line| *line > 0).unwrap_or(1),
            "endLine": args.end_line.filter(|line| *line > 0).unwrap_or(total_lines),
            "totalLines": total_lines,
            "language": file_language(&args.file_path),
            "content": source,
        })))
    }
}

#[derive(Debug, Deserialize)]
struct SearchEditorDocsArgs {
    query: String,
    category: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
}

pub struct SearchEditorDocsHandler {
    engine: Arc<QueryEngine>,
}

impl SearchEditorDocsHandler {
    pub const NAME: &'static str = "search_babylon_editor_docs";

    #[inline]
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: Self::NAME.to_string(),
            description:
                "Search Babylon.js Editor documentation for tool usage, workflows, and features"
                    .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query for Editor documentation"
                    },
                    "category": {
                        "type": "string",
                        "description": "Optional category filter (e.g., \"scripting\", \"advanced\", \"tips\")"
                    },
                    "limit": limit_schema()
                },
                "required": ["query"]
            }),
        }
    }
}

/// Query options for an editor search: prefixed category, or over-fetch
/// so enough editor pages survive filtering
pub fn editor_search_options(category: Option<&str>, limit: usize) -> SearchOptions {
    match category {
        Some(category) => SearchOptions {
            limit,
            category: Some(format!("editor/{}", category)),
        },
        None => SearchOptions {
            limit: limit.saturating_mul(EDITOR_OVERFETCH),
            category: None,
        },
    }
}

#[async_trait]
impl ToolHandler for SearchEditorDocsHandler {
    #[inline]
    async fn handle(&self, arguments: Map<String, Value>) -> Result<CallToolResult, McpError> {
        let args: SearchEditorDocsArgs = parse_arguments(Self::NAME, arguments)?;

        let options = editor_search_options(args.category.as_deref(), args.limit);
        let results = match self.engine.search(&args.query, &options).await {
            Ok(results) => results,
            Err(e) => {
                error!("Error searching Editor documentation: {}", e);
                return Ok(error_response(&e, "searching Editor documentation"));
            }
        };

        let editor_results: Vec<SearchResult> = results
            .into_iter()
            .filter(|result| result.source == EDITOR_SOURCE)
            .take(args.limit)
            .collect();

        if editor_results.is_empty() {
            return Ok(no_results_response(&args.query, "Editor documentation"));
        }
        Ok(json_response(&json!({
            "query": args.query,
            "source": EDITOR_SOURCE,
            "totalResults": editor_results.len(),
            "results": ranked_documents(&editor_results),
        })))
    }
}

/// Register every tool against one shared engine
#[inline]
pub async fn register_all(server: &McpServer, engine: &Arc<QueryEngine>) {
    server
        .register_tool(
            SearchDocsHandler::tool_definition(),
            SearchDocsHandler::new(Arc::clone(engine)),
        )
        .await;
    server
        .register_tool(
            GetDocHandler::tool_definition(),
            GetDocHandler::new(Arc::clone(engine)),
        )
        .await;
    server
        .register_tool(
            SearchApiHandler::tool_definition(),
            SearchApiHandler::new(Arc::clone(engine)),
        )
        .await;
    server
        .register_tool(
            SearchSourceHandler::tool_definition(),
            SearchSourceHandler::new(Arc::clone(engine)),
        )
        .await;
    server
        .register_tool(
            GetSourceHandler::tool_definition(),
            GetSourceHandler::new(Arc::clone(engine)),
        )
        .await;
    server
        .register_tool(
            SearchEditorDocsHandler::tool_definition(),
            SearchEditorDocsHandler::new(Arc::clone(engine)),
        )
        .await;
}
