#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! Vector store behaviour with realistic source chunk records

use babylon_docs_mcp::config::Config;
use babylon_docs_mcp::database::{EmbeddingRecord, VectorStore, equality_predicate};
use babylon_docs_mcp::records::SourceChunkRecord;
use futures::future::join_all;
use tempfile::TempDir;

const TABLE: &str = "babylon_source_code";
const DIMENSION: usize = 768;
const PACKAGES: [&str; 3] = ["core", "gui", "loaders"];

fn create_test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    (config, temp_dir)
}

/// A 768-dimensional vector peaked around `topic`
fn topic_vector(topic: usize) -> Vec<f32> {
    (0..DIMENSION)
        .map(|i| {
            let distance = i.abs_diff(topic * 7 % DIMENSION) as f32;
            (-distance / 12.0).exp()
        })
        .collect()
}

fn create_chunk(index: usize) -> EmbeddingRecord<SourceChunkRecord> {
    let package = PACKAGES[index % PACKAGES.len()];
    let file_path = format!("packages/dev/{}/src/generated/file{}.ts", package, index);
    let record = SourceChunkRecord {
        id: format!("{}:1-200", file_path),
        url: format!(
            "https://github.com/BabylonJS/Babylon.js/blob/master/{}#L1-L200",
            file_path
        ),
        file_path,
        package: package.to_string(),
        content: format!("export class Generated{} {{\n    public value = {};\n}}", index, index),
        start_line: 1,
        end_line: 200,
        language: "typescript".to_string(),
        imports: "../Maths/math.vector".to_string(),
        exports: format!("Generated{}", index),
    };
    EmbeddingRecord::new(record, topic_vector(index))
}

#[tokio::test]
async fn large_batch_is_written_and_searchable() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    let dataset: Vec<_> = (0..300).map(create_chunk).collect();
    let written = store
        .replace_table(TABLE, &dataset, DIMENSION)
        .await
        .expect("should write batch");
    assert_eq!(written, 300);
    assert_eq!(store.count_rows(TABLE).await.expect("should count"), 300);
    assert_eq!(
        store
            .vector_dimension(TABLE)
            .await
            .expect("should read dimension"),
        DIMENSION
    );

    let results = store
        .search::<SourceChunkRecord>(TABLE, &topic_vector(42), 20, None)
        .await
        .expect("search should succeed");
    assert_eq!(results.len(), 20);
    assert_eq!(results[0].0.exports, "Generated42");
    assert!(results[0].1.is_some_and(|distance| distance < 1e-3));
}

#[tokio::test]
async fn package_filter_applies_before_ranking() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config)
        .await
        .expect("should create vector store");
    let dataset: Vec<_> = (0..60).map(create_chunk).collect();
    store
        .replace_table(TABLE, &dataset, DIMENSION)
        .await
        .expect("should write batch");

    let filter = equality_predicate("package", "gui");
    let results = store
        .search::<SourceChunkRecord>(TABLE, &topic_vector(0), 50, Some(&filter))
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 20);
    assert!(results.iter().all(|(chunk, _)| chunk.package == "gui"));
}

#[tokio::test]
async fn tables_survive_reopening_the_store() {
    let (config, _temp_dir) = create_test_config();
    {
        let store = VectorStore::new(&config)
            .await
            .expect("should create vector store");
        let dataset: Vec<_> = (0..10).map(create_chunk).collect();
        store
            .replace_table(TABLE, &dataset, DIMENSION)
            .await
            .expect("should write batch");
    }

    let reopened = VectorStore::open(&config.vector_database_path())
        .await
        .expect("should reopen store");
    assert!(reopened.has_table(TABLE).await.expect("should list tables"));

    let rows = reopened
        .query::<SourceChunkRecord>(
            TABLE,
            Some(&equality_predicate("exports", "Generated7")),
            None,
        )
        .await
        .expect("query should succeed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].file_path, create_chunk(7).record.file_path);
    assert_eq!(rows[0].package, "gui");
}

#[tokio::test]
async fn concurrent_searches_share_one_store() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config)
        .await
        .expect("should create vector store");
    let dataset: Vec<_> = (0..90).map(create_chunk).collect();
    store
        .replace_table(TABLE, &dataset, DIMENSION)
        .await
        .expect("should write batch");

    let queries: Vec<_> = (0..8).map(|topic| topic_vector(topic * 10)).collect();
    let searches = queries
        .iter()
        .map(|vector| store.search::<SourceChunkRecord>(TABLE, vector, 3, None));
    let outcomes = join_all(searches).await;

    for (topic, outcome) in outcomes.into_iter().enumerate() {
        let results = outcome.expect("search should succeed");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0.exports, format!("Generated{}", topic * 10));
    }
}
