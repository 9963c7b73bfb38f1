//! Fixtures shared by the integration tests: a deterministic bag-of-words
//! embedder and a miniature checkout of the Babylon.js repositories.

#![allow(dead_code, reason = "each test binary uses a subset of the helpers")]

use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use babylon_docs_mcp::Result;
use babylon_docs_mcp::config::{Config, DocumentSource, IndexingConfig};
use babylon_docs_mcp::embeddings::Embedder;
use babylon_docs_mcp::indexer::BatchIndexer;
use babylon_docs_mcp::indexer::api::ApiSource;
use babylon_docs_mcp::indexer::documents::DocumentSourceSet;
use babylon_docs_mcp::indexer::source_code::SourceCodeSource;
use babylon_docs_mcp::search::{EngineSettings, QueryEngine};
use tempfile::TempDir;

pub const DIMENSION: usize = 256;

/// Hashes lowercase words into buckets and normalizes, so texts sharing
/// words land close together
pub struct HashingEmbedder;

pub fn hash_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0_f32; DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        word.to_lowercase().hash(&mut hasher);
        let bucket = (hasher.finish() % DIMENSION as u64) as usize;
        vector[bucket] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embedding(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| hash_embedding(text)).collect())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}

const MATERIALS_PAGE: &str = r##"---
title: Materials
description: Giving meshes a PBR look with metallic and roughness
keywords: pbr, material, metallic
---

# Materials

PBR material rendering uses metallic and roughness values. A PBR material
reacts to environment lighting.

```javascript
const pbr = new BABYLON.PBRMaterial("pbr", scene);
pbr.metallic = 1.0;
```

<Playground id="#2FDQT5#1" title="PBR material" />
"##;

const CAMERAS_PAGE: &str = r#"---
title: Cameras
description: Looking at the scene through arc rotate and free cameras
keywords: camera, arcrotate
---

# Cameras

An arc rotate camera orbits around a target. The free camera moves with
keyboard and mouse input.
"#;

const EDITOR_ROOT_PAGE: &str = r#"export default function Page() {
    return (
        <main>
            <div className="text-5xl">Editor Documentation</div>
            <p>The editor lets you compose complete projects visually and export them.</p>
        </main>
    );
}
"#;

const EDITOR_SCRIPTING_PAGE: &str = r#"export default function Page() {
    return (
        <main>
            <div className="text-5xl">Scripting</div>
            <p>Attach scripts to scene nodes to add behavior to your objects.</p>
            <p>Decorators expose script properties in the inspector panel.</p>
        </main>
    );
}
"#;

const MESH_BUILDER_SOURCE: &str = r#"import { Mesh } from "./mesh";

/**
 * Class containing static functions to help procedurally build meshes
 */
export class MeshBuilder {
    /**
     * Creates a box mesh
     * @param name defines the name of the mesh
     * @param size defines the size of the box
     * @returns the box mesh
     */
    public static CreateBox(name: string, size: number): Mesh {
        return new Mesh(name, size);
    }
}
"#;

const BUTTON_SOURCE: &str = r#"import { Control } from "./control";

/**
 * Class used to create a clickable gui button
 */
export class Button extends Control {
    /**
     * Text displayed on the button
     */
    public text: string = "";
}
"#;

/// A config rooted in a temp dir holding miniature repositories
pub struct Workspace {
    pub dir: TempDir,
    pub config: Config,
}

impl Workspace {
    pub fn materials_page(&self) -> PathBuf {
        self.config
            .repositories_dir()
            .join("Documentation/content/features/materials.md")
    }

    pub fn source_root(&self) -> PathBuf {
        self.config.source_repository_path()
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("should create fixture directory");
    }
    std::fs::write(path, content).expect("should write fixture file");
}

pub fn workspace() -> Workspace {
    let dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        indexing: IndexingConfig {
            api_packages: vec!["core".to_string(), "gui".to_string()],
            source_packages: vec!["core".to_string(), "gui".to_string()],
            ..IndexingConfig::default()
        },
        document_sources: vec![
            DocumentSource {
                name: "documentation".to_string(),
                path: PathBuf::from("Documentation/content"),
                url_prefix: "https://doc.babylonjs.com".to_string(),
                url_extension: None,
            },
            DocumentSource {
                name: "editor-docs".to_string(),
                path: PathBuf::from("Editor/website/src/app/documentation"),
                url_prefix: "https://editor.babylonjs.com/documentation".to_string(),
                url_extension: None,
            },
        ],
        base_dir: dir.path().to_path_buf(),
        ..Config::default()
    };

    let repositories = config.repositories_dir();
    write(
        &repositories.join("Documentation/content/features/materials.md"),
        MATERIALS_PAGE,
    );
    write(
        &repositories.join("Documentation/content/features/cameras.md"),
        CAMERAS_PAGE,
    );
    write(
        &repositories.join("Editor/website/src/app/documentation/page.tsx"),
        EDITOR_ROOT_PAGE,
    );
    write(
        &repositories.join("Editor/website/src/app/documentation/scripting/page.tsx"),
        EDITOR_SCRIPTING_PAGE,
    );
    write(
        &repositories.join("Babylon.js/packages/dev/core/src/Meshes/meshBuilder.ts"),
        MESH_BUILDER_SOURCE,
    );
    write(
        &repositories.join("Babylon.js/packages/dev/gui/src/button.ts"),
        BUTTON_SOURCE,
    );
    write(
        &repositories.join("Babylon.js/packages/dev/core/src/node_modules/ignored.ts"),
        "export const ignored = true;\n",
    );

    Workspace { dir, config }
}

/// Build all three tables for the workspace
pub async fn index_workspace(workspace: &Workspace) {
    let mut indexer = BatchIndexer::new(&workspace.config, Arc::new(HashingEmbedder));
    indexer.initialize().await.expect("should initialize indexer");

    indexer
        .index(&DocumentSourceSet::from_config(&workspace.config))
        .await
        .expect("should index documentation");
    indexer
        .index(&ApiSource::from_config(&workspace.config))
        .await
        .expect("should index api");
    indexer
        .index(&SourceCodeSource::from_config(&workspace.config).expect("should build source"))
        .await
        .expect("should index source code");
    indexer.close();
}

pub async fn engine(workspace: &Workspace) -> QueryEngine {
    QueryEngine::connect(
        EngineSettings::from_config(&workspace.config),
        Arc::new(HashingEmbedder),
    )
    .await
    .expect("should connect query engine")
}
