use super::*;
use std::fs;
use tempfile::TempDir;

const MATERIALS_PAGE: &str = "---\ntitle: Materials\ndescription: How materials work\nkeywords: material, pbr\n---\n\n# Materials\n\n## Standard\n\n```javascript\nconst mat = new BABYLON.StandardMaterial(\"m\", scene);\n```\n\n<Playground id=\"#ABC123#4\" title=\"demo\"/>\n";

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("should create parent directory");
    }
    fs::write(path, content).expect("should write file");
}

fn docs_source(root: &Path) -> ResolvedSource {
    ResolvedSource {
        source: DocumentSource {
            name: "documentation".to_string(),
            path: PathBuf::from("Documentation/content"),
            url_prefix: "https://doc.babylonjs.com".to_string(),
            url_extension: None,
        },
        root: root.to_path_buf(),
    }
}

fn editor_source(root: &Path) -> ResolvedSource {
    ResolvedSource {
        source: DocumentSource {
            name: "editor-docs".to_string(),
            path: PathBuf::from("Editor/website/src/app/documentation"),
            url_prefix: "https://editor.babylonjs.com/documentation".to_string(),
            url_extension: None,
        },
        root: root.to_path_buf(),
    }
}

fn github_source(root: &Path) -> ResolvedSource {
    ResolvedSource {
        source: DocumentSource {
            name: "source-repo".to_string(),
            path: PathBuf::from("Babylon.js"),
            url_prefix: "https://github.com/BabylonJS/Babylon.js/blob/master".to_string(),
            url_extension: Some(".md".to_string()),
        },
        root: root.to_path_buf(),
    }
}

#[test]
fn page_stem_strips_known_suffixes() {
    assert_eq!(page_stem("features/materials.md"), "features/materials");
    assert_eq!(page_stem("scripting/page.tsx"), "scripting");
    assert_eq!(page_stem("page.tsx"), "");
    assert_eq!(page_stem("notes.txt"), "notes.txt");
}

#[test]
fn ids_replace_separators_and_name_root_pages() {
    assert_eq!(
        document_id("documentation", "features/materials"),
        "documentation_features_materials"
    );
    assert_eq!(document_id("editor-docs", ""), "editor-docs_index");
}

#[test]
fn urls_follow_source_prefix_and_extension() {
    let dir = TempDir::new().expect("should create temp dir");
    assert_eq!(
        document_url(&docs_source(dir.path()).source, "features/materials"),
        "https://doc.babylonjs.com/features/materials"
    );
    assert_eq!(
        document_url(&github_source(dir.path()).source, "packages/dev/core/readme"),
        "https://github.com/BabylonJS/Babylon.js/blob/master/packages/dev/core/readme.md"
    );
    assert_eq!(
        document_url(&editor_source(dir.path()).source, ""),
        "https://editor.babylonjs.com/documentation"
    );
}

#[test]
fn discovery_walks_sources_in_order() {
    let docs_dir = TempDir::new().expect("should create temp dir");
    let editor_dir = TempDir::new().expect("should create temp dir");
    write(docs_dir.path(), "features/materials.md", MATERIALS_PAGE);
    write(docs_dir.path(), "features/notes.txt", "not a page");
    write(docs_dir.path(), "node_modules/pkg/readme.md", "# skipped");
    write(editor_dir.path(), "scripting/page.tsx", "export default function Page() { return <div/>; }");
    write(editor_dir.path(), "scripting/layout.tsx", "export default {};");

    let set = DocumentSourceSet::new(
        vec![docs_source(docs_dir.path()), editor_source(editor_dir.path())],
        "babylon_docs",
        20_000,
    );
    let units = set.discover().expect("should discover units");

    assert_eq!(units.len(), 2);
    assert_eq!(units[0].group, "documentation");
    assert!(units[0].path.ends_with("features/materials.md"));
    assert_eq!(units[1].group, "editor-docs");
    assert!(units[1].path.ends_with("scripting/page.tsx"));
}

#[test]
fn only_keeps_named_sources() {
    let dir = TempDir::new().expect("should create temp dir");
    let set = DocumentSourceSet::new(
        vec![docs_source(dir.path()), editor_source(dir.path())],
        "babylon_docs",
        20_000,
    )
    .only(&["editor-docs".to_string()]);
    assert_eq!(set.sources().len(), 1);
    assert_eq!(set.sources()[0].source.name, "editor-docs");
}

#[test]
fn markdown_unit_becomes_flattened_record() {
    let dir = TempDir::new().expect("should create temp dir");
    let content_root = dir.path().join("content");
    write(&content_root, "features/materials.md", MATERIALS_PAGE);

    let set = DocumentSourceSet::new(vec![docs_source(&content_root)], "babylon_docs", 20_000);
    let unit = IndexUnit::new("documentation", content_root.join("features/materials.md"));
    let records = set.extract(&unit).expect("should extract record");

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.id, "documentation_features_materials");
    assert_eq!(record.title, "Materials");
    assert_eq!(record.description, "How materials work");
    assert_eq!(record.keywords, "material, pbr");
    assert_eq!(record.category, "features/materials");
    assert_eq!(record.breadcrumbs, "features > materials");
    assert_eq!(record.url, "https://doc.babylonjs.com/features/materials");
    assert_eq!(record.source, "documentation");
    assert_eq!(record.headings, "Materials | Standard");
    assert!(record.code_snippets.contains("StandardMaterial"));
    assert_eq!(record.playground_ids, "ABC123#4");
    assert!(record.file_path.ends_with("features/materials.md"));
}

#[test]
fn content_is_truncated_to_limit() {
    let dir = TempDir::new().expect("should create temp dir");
    let body = format!("# Long\n\n{}", "word ".repeat(400));
    write(dir.path(), "long.md", &body);

    let set = DocumentSourceSet::new(vec![docs_source(dir.path())], "babylon_docs", 500);
    let unit = IndexUnit::new("documentation", dir.path().join("long.md"));
    let records = set.extract(&unit).expect("should extract record");

    assert_eq!(records[0].content.chars().count(), 503);
    assert!(records[0].content.ends_with("..."));
    assert_eq!(records[0].category, UNCATEGORIZED);
}

#[test]
fn unknown_group_is_an_extraction_error() {
    let dir = TempDir::new().expect("should create temp dir");
    write(dir.path(), "a.md", "# A");
    let set = DocumentSourceSet::new(vec![docs_source(dir.path())], "babylon_docs", 500);
    let result = set.extract(&IndexUnit::new("missing", dir.path().join("a.md")));
    assert!(matches!(result, Err(DocsError::Extraction(_))));
}
