use super::*;
use crate::records::{ApiKind, ApiParameter, ApiReturn};
use std::fs;
use tempfile::TempDir;

const URL_BASE: &str = "https://github.com/BabylonJS/Babylon.js/blob/master";

fn method_doc() -> ApiDocumentation {
    ApiDocumentation {
        name: "getMeshByName".to_string(),
        full_name: "Scene.getMeshByName".to_string(),
        kind: ApiKind::Method,
        summary: "Gets a mesh using its name".to_string(),
        description: "Gets a mesh using its name".to_string(),
        examples: vec!["scene.getMeshByName(\"a\")".to_string(), "scene.getMeshByName(\"b\")".to_string()],
        parameters: vec![ApiParameter {
            name: "name".to_string(),
            type_name: "string".to_string(),
            description: "defines the name".to_string(),
            optional: false,
        }],
        returns: Some(ApiReturn {
            type_name: "Nullable<AbstractMesh>".to_string(),
            description: "the mesh".to_string(),
        }),
        type_name: None,
        deprecated: None,
        see: vec!["Scene.getMeshById".to_string()],
        since: Some("4.0".to_string()),
        source_file: "packages/dev/core/src/scene.ts".to_string(),
        source_line: 3510,
    }
}

#[test]
fn id_replaces_non_alphanumerics() {
    assert_eq!(api_id(&method_doc()), "api_Method_Scene_getMeshByName");
}

#[test]
fn category_prefers_package_segment() {
    assert_eq!(api_category(&method_doc()), "api/core");

    let outside = ApiDocumentation {
        source_file: "tools/helpers.ts".to_string(),
        ..method_doc()
    };
    assert_eq!(api_category(&outside), "api/method");
}

#[test]
fn url_points_at_declaration_line() {
    assert_eq!(
        api_url(&method_doc(), URL_BASE),
        "https://github.com/BabylonJS/Babylon.js/blob/master/packages/dev/core/src/scene.ts#L3510"
    );

    let absolute = ApiDocumentation {
        source_file: "/home/user/repos/Babylon.js/packages/dev/gui/src/button.ts".to_string(),
        source_line: 7,
        ..method_doc()
    };
    assert_eq!(
        api_url(&absolute, URL_BASE),
        "https://github.com/BabylonJS/Babylon.js/blob/master/packages/dev/gui/src/button.ts#L7"
    );
}

#[test]
fn record_encodes_structured_fields() {
    let record = api_record(&method_doc(), URL_BASE).expect("should build record");

    assert_eq!(record.kind, ApiKind::Method);
    assert_eq!(record.parameter_list(), method_doc().parameters);
    assert_eq!(
        record.return_value().map(|r| r.type_name),
        Some("Nullable<AbstractMesh>".to_string())
    );
    assert_eq!(record.example_list().len(), 2);
    assert_eq!(record.see, "Scene.getMeshById");
    assert_eq!(record.since, "4.0");
    assert_eq!(record.deprecated, "");
    assert_eq!(record.type_name, "");
}

#[test]
fn missing_return_is_stored_empty() {
    let doc = ApiDocumentation {
        returns: None,
        ..method_doc()
    };
    let record = api_record(&doc, URL_BASE).expect("should build record");
    assert!(record.returns.is_empty());
}

#[test]
fn discovers_and_extracts_package_declarations() {
    let dir = TempDir::new().expect("should create temp dir");
    let src = package_source_dir(dir.path(), "core");
    fs::create_dir_all(src.join("Meshes")).expect("should create package dir");
    fs::write(
        src.join("Meshes/mesh.ts"),
        "/** A mesh */\nexport class Mesh {\n    /** Mesh name */\n    public name: string;\n}\n",
    )
    .expect("should write source");
    fs::write(src.join("Meshes/mesh.d.ts"), "export declare class Mesh {}\n")
        .expect("should write declarations");

    let source = ApiSource::new(dir.path().to_path_buf(), vec!["core".to_string(), "gui".to_string()], "babylon_api", URL_BASE);
    let units = source.discover().expect("should discover units");
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].group, "core");

    let records = source.extract(&units[0]).expect("should extract records");
    let names: Vec<&str> = records.iter().map(|r| r.full_name.as_str()).collect();
    assert_eq!(names, vec!["Mesh", "Mesh.name"]);
    assert_eq!(records[0].source_file, "packages/dev/core/src/Meshes/mesh.ts");
    assert_eq!(records[0].category, "api/core");
    assert_eq!(records[1].id, "api_Property_Mesh_name");
    assert!(records[1].url.ends_with("mesh.ts#L4"));
}

#[test]
fn with_packages_overrides_only_when_given() {
    let source = ApiSource::new(PathBuf::from("/repo"), vec!["core".to_string()], "babylon_api", URL_BASE);
    let same = source.clone().with_packages(Vec::new());
    assert_eq!(same.packages(), &["core".to_string()]);
    let gui = source.with_packages(vec!["gui".to_string()]);
    assert_eq!(gui.packages(), &["gui".to_string()]);
}
