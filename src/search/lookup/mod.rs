//! Path handling for single-document and source-file lookups.


use std::path::{Component, Path, PathBuf};

use crate::indexer::documents::{ResolvedSource, document_id, page_stem};

/// Segment marking the start of a page path inside a documentation checkout
pub const CONTENT_ROOT_MARKER: &str = "content/";

/// Source name used when a path matches no configured document source
const FALLBACK_SOURCE: &str = "documentation";

/// Derive a document id from a URL, file path or page path
///
/// A matching source URL prefix selects that source and is stripped;
/// otherwise the first source is assumed. Page suffixes and everything up to
/// a `content/` segment are removed before the id is formed.
#[inline]
pub fn path_to_doc_id(path: &str, sources: &[ResolvedSource]) -> String {
    let normalized = path.trim().replace('\\', "/");

    let matched = sources.iter().find_map(|resolved| {
        let prefix = resolved.source.url_prefix.trim_end_matches('/');
        normalized
            .strip_prefix(prefix)
            .map(|rest| (resolved, rest.to_string()))
    });

    let (source_name, rest) = match matched {
        Some((resolved, rest)) => (resolved.source.name.as_str(), rest),
        None => (
            sources
                .first()
                .map_or(FALLBACK_SOURCE, |resolved| resolved.source.name.as_str()),
            normalized,
        ),
    };

    let rest = rest.split(['#', '?']).next().unwrap_or_default();
    let rest = strip_through_marker(rest, CONTENT_ROOT_MARKER).unwrap_or(rest);
    let stem = page_stem(rest.trim_matches('/'));
    document_id(source_name, stem.trim_matches('/'))
}

/// The part of `path` after the last occurrence of `marker` at a segment start
#[inline]
pub fn strip_through_marker<'a>(path: &'a str, marker: &str) -> Option<&'a str> {
    if let Some(rest) = path.strip_prefix(marker) {
        let nested = strip_through_marker(rest, marker);
        return Some(nested.unwrap_or(rest));
    }
    let needle = format!("/{}", marker);
    path.rfind(&needle)
        .and_then(|index| path.get(index + needle.len()..))
}

/// Local files that may hold fresher content for a stored document
///
/// The stored path itself comes first, then for every source the stored
/// path re-rooted under that source's checkout.
#[inline]
pub fn overlay_candidates(file_path: &str, sources: &[ResolvedSource]) -> Vec<PathBuf> {
    let normalized = file_path.replace('\\', "/");
    let mut candidates = vec![PathBuf::from(file_path)];

    for resolved in sources {
        let Some(marker) = resolved
            .root
            .file_name()
            .map(|name| format!("{}/", name.to_string_lossy()))
        else {
            continue;
        };
        if let Some(rest) = strip_through_marker(&normalized, &marker) {
            let candidate = resolved.root.join(rest);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

/// Join a repository-relative path, refusing absolute paths and anything that
/// leaves the root
#[inline]
pub fn resolve_within(root: &Path, relative: &str) -> Option<PathBuf> {
    if relative.starts_with(['/', '\\']) {
        return None;
    }
    let relative = Path::new(relative);
    let escapes = relative.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    (!escapes).then(|| root.join(relative))
}

/// 1-indexed inclusive line range of `content`; out-of-range bounds are clamped
#[inline]
pub fn slice_lines(content: &str, start_line: usize, end_line: usize) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let start = start_line.saturating_sub(1).min(lines.len());
    let end = end_line.min(lines.len()).max(start);
    lines.get(start..end).unwrap_or_default().join("\n")
}
