
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::{DocsError, Result};

/// A contiguous, 1-based, inclusive range of lines cut from a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChunk {
    pub start_line: usize,
    pub end_line: usize,
    /// The lines of the range joined with `\n`
    pub content: String,
}

/// Configuration for line-window chunking of source files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Number of lines per window
    pub chunk_lines: usize,
    /// Lines shared by consecutive windows
    pub overlap_lines: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_lines: 200,
            overlap_lines: 20,
        }
    }
}

impl ChunkingConfig {
    /// Reject window shapes that would stall or skip lines
    #[inline]
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.chunk_lines == 0 || self.chunk_lines > 5000 {
            return Err(ConfigError::InvalidChunkLines(self.chunk_lines));
        }
        if self.overlap_lines >= self.chunk_lines {
            return Err(ConfigError::OverlapTooLarge(
                self.overlap_lines,
                self.chunk_lines,
            ));
        }
        Ok(())
    }

    /// Distance between the first lines of consecutive windows
    #[inline]
    pub fn stride(&self) -> usize {
        self.chunk_lines.saturating_sub(self.overlap_lines).max(1)
    }
}

/// `content` without one trailing `\n` or `\r\n`, which ends the last line rather than starting another
fn without_final_newline(content: &str) -> &str {
    content
        .strip_suffix("\r\n")
        .or_else(|| content.strip_suffix('\n'))
        .unwrap_or(content)
}

/// Cut `content` into overlapping windows of lines.
///
/// Windows start every [`ChunkingConfig::stride`] lines and the last window is
/// the first one reaching the end of the file, so no tail window is wholly
/// contained in its predecessor. Windows holding only whitespace are skipped.
///
/// # Arguments
/// * `content` - File text; lines are split on `\n`, a final newline ends the last line
/// * `config` - Window shape
///
/// # Returns
/// * `Result<Vec<LineChunk>>` - Windows in file order, or a `Config` error when
///   the overlap is not smaller than the window
#[inline]
pub fn chunk_lines(content: &str, config: &ChunkingConfig) -> Result<Vec<LineChunk>> {
    config
        .validate()
        .map_err(|e| DocsError::Config(e.to_string()))?;

    let lines: Vec<&str> = without_final_newline(content).split('\n').collect();
    let size = config.chunk_lines;
    let stride = config.stride();

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(lines.len());
        let window = lines.get(start..end).unwrap_or_default();
        let text = window.join("\n");

        if !text.trim().is_empty() {
            chunks.push(LineChunk {
                start_line: start + 1,
                end_line: end,
                content: text,
            });
        }

        if end >= lines.len() {
            break;
        }
        start += stride;
    }

    debug!(
        "Chunked {} lines into {} windows of {} (overlap {})",
        lines.len(),
        chunks.len(),
        size,
        config.overlap_lines
    );

    Ok(chunks)
}
