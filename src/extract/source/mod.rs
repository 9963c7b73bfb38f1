//! Discovery and whole-file metadata for package source files.


use fancy_regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into when walking package sources
pub const SKIPPED_DIRECTORIES: &[&str] = &["node_modules", "dist", "build", "lib", ".git"];

/// Import specifiers and exported names kept per file
pub const MAX_FILE_SYMBOLS: usize = 20;

static SOURCE_FILE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(ts|tsx|js|jsx)$").expect("valid regex"));

static IMPORT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+(?:\{[^}]+\}|[^;]+)\s+from\s+['"]([^'"]+)['"]"#).expect("valid regex")
});

static EXPORT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"export\s+(?:default\s+)?(?:abstract\s+|declare\s+)?(?:class|function|interface|type|const|let|var|enum)\s+([A-Za-z_$][A-Za-z0-9_$]*)",
    )
    .expect("valid regex")
});

fn is_skipped_directory(entry: &DirEntry, skipped: &[&str]) -> bool {
    entry.file_type().is_dir()
        && entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| skipped.contains(&name))
}

/// Files under `root` whose path passes `accept`, in sorted order
///
/// Directories named in `skipped` are not descended into. A missing root
/// yields an empty list.
#[inline]
pub fn walk_files(
    root: &Path,
    skipped: &[&str],
    accept: impl Fn(&Path) -> bool,
) -> Vec<PathBuf> {
    if !root.is_dir() {
        debug!("Skipping missing directory {}", root.display());
        return Vec::new();
    }

    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_directory(entry, skipped))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .filter(|path| accept(path))
        .collect()
}

#[inline]
pub fn is_source_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| SOURCE_FILE_REGEX.is_match(name).unwrap_or(false))
}

/// TypeScript files carrying declarations worth documenting
#[inline]
pub fn is_api_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            (name.ends_with(".ts") || name.ends_with(".tsx")) && !name.ends_with(".d.ts")
        })
}

/// All `.ts/.tsx/.js/.jsx` files of a package source directory
#[inline]
pub fn discover_source_files(root: &Path) -> Vec<PathBuf> {
    walk_files(root, SKIPPED_DIRECTORIES, is_source_file)
}

#[inline]
pub fn source_language(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ts" | "tsx") => "typescript",
        _ => "javascript",
    }
}

/// Module specifiers of `import ... from '...'` statements
#[inline]
pub fn extract_imports(content: &str) -> Vec<String> {
    capture_names(&IMPORT_REGEX, content)
}

/// Names introduced by `export class|function|const|...` declarations
#[inline]
pub fn extract_exports(content: &str) -> Vec<String> {
    capture_names(&EXPORT_REGEX, content)
}

fn capture_names(regex: &Regex, content: &str) -> Vec<String> {
    regex
        .captures_iter(content)
        .flatten()
        .filter_map(|captures| captures.get(1).map(|m| m.as_str().to_string()))
        .take(MAX_FILE_SYMBOLS)
        .collect()
}

/// Forward-slash path of `path` relative to `base`
#[inline]
pub fn relative_path(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
