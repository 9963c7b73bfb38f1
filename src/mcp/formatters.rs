//! Text payloads returned by the tools.

use serde::Serialize;

use crate::mcp::protocol::CallToolResult;

/// Pretty-printed JSON payload
#[inline]
pub fn json_response<T: Serialize>(data: &T) -> CallToolResult {
    match serde_json::to_string_pretty(data) {
        Ok(text) => CallToolResult::text(text),
        Err(e) => error_response(&e, "formatting response"),
    }
}

/// `Error {context}: {message}`, flagged as a tool error
#[inline]
pub fn error_response(error: &dyn std::fmt::Display, context: &str) -> CallToolResult {
    CallToolResult::error(format!("Error {}: {}", context, error))
}

#[inline]
pub fn no_results_response(query: &str, resource_type: &str) -> CallToolResult {
    CallToolResult::text(format!(
        "No {resource_type} found for \"{query}\". Try different search terms or check if the {resource_type} has been indexed."
    ))
}

#[inline]
pub fn not_found_response(
    identifier: &str,
    resource_type: &str,
    additional_info: Option<&str>,
) -> CallToolResult {
    let info = additional_info.map(|info| format!(" {}", info)).unwrap_or_default();
    CallToolResult::text(format!("{} not found: {}.{}", resource_type, identifier, info))
}

/// Score in `[0, 1]` as a percentage with one decimal, e.g. `87.3%`
#[inline]
pub fn relevance(score: f32) -> String {
    format!("{:.1}%", score * 100.0)
}
