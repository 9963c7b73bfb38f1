use super::*;
use crate::records::SourceChunkRecord;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::{self, ThreadId};
use tempfile::TempDir;

/// Vectors built from text length, so identical inputs embed identically
struct LengthEmbedder {
    calls: AtomicUsize,
    healthy: bool,
}

impl LengthEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            healthy: true,
        }
    }
}

#[async_trait]
impl Embedder for LengthEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let len = text.len() as f32;
        Ok(vec![len, 1.0, 0.5])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vectors = Vec::new();
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        3
    }

    async fn health_check(&self) -> Result<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(DocsError::Embedding("model not loaded".to_string()))
        }
    }
}

/// Units named `fail` cannot be extracted; `empty` units yield nothing
#[derive(Clone)]
struct FakeSource {
    units: Vec<&'static str>,
}

impl IndexSource for FakeSource {
    type Record = SourceChunkRecord;

    fn name(&self) -> &str {
        "fake"
    }

    fn table_name(&self) -> &str {
        "fake_table"
    }

    fn discover(&self) -> Result<Vec<IndexUnit>> {
        Ok(self
            .units
            .iter()
            .map(|name| IndexUnit::new("pkg", *name))
            .collect())
    }

    fn extract(&self, unit: &IndexUnit) -> Result<Vec<SourceChunkRecord>> {
        let name = unit.path.to_string_lossy().to_string();
        match name.as_str() {
            "fail" => Err(DocsError::Extraction("broken file".to_string())),
            "empty" => Ok(Vec::new()),
            _ => Ok((1..=2)
                .map(|i| SourceChunkRecord {
                    id: format!("{}:{}", name, i),
                    file_path: name.clone(),
                    package: unit.group.clone(),
                    content: format!("chunk {} of {}", i, name),
                    start_line: i,
                    end_line: i,
                    language: "typescript".to_string(),
                    imports: String::new(),
                    exports: String::new(),
                    url: String::new(),
                })
                .collect()),
        }
    }

    fn embedding_text(&self, record: &SourceChunkRecord) -> String {
        record.content.clone()
    }
}

/// Records the thread each extraction ran on; `panic` units panic mid-extract
#[derive(Clone)]
struct ThreadRecordingSource {
    inner: FakeSource,
    threads: Arc<Mutex<Vec<ThreadId>>>,
}

impl IndexSource for ThreadRecordingSource {
    type Record = SourceChunkRecord;

    fn name(&self) -> &str {
        "threads"
    }

    fn table_name(&self) -> &str {
        "thread_table"
    }

    fn discover(&self) -> Result<Vec<IndexUnit>> {
        self.inner.discover()
    }

    fn extract(&self, unit: &IndexUnit) -> Result<Vec<SourceChunkRecord>> {
        self.threads
            .lock()
            .expect("should lock thread list")
            .push(thread::current().id());
        if unit.path.to_string_lossy() == "panic" {
            panic!("parser blew up");
        }
        self.inner.extract(unit)
    }

    fn embedding_text(&self, record: &SourceChunkRecord) -> String {
        record.content.clone()
    }
}

async fn initialized(dir: &TempDir) -> (BatchIndexer, Arc<LengthEmbedder>) {
    let embedder = Arc::new(LengthEmbedder::new());
    let shared: Arc<dyn Embedder> = Arc::<LengthEmbedder>::clone(&embedder);
    let mut indexer = BatchIndexer::with_store_path(&dir.path().join("vectors"), shared);
    indexer.initialize().await.expect("should initialize indexer");
    (indexer, embedder)
}

#[tokio::test]
async fn index_before_initialize_fails() {
    let dir = TempDir::new().expect("should create temp dir");
    let indexer = BatchIndexer::with_store_path(&dir.path().join("vectors"), Arc::new(LengthEmbedder::new()));
    let result = indexer.index(&FakeSource { units: vec!["a"] }).await;
    assert!(matches!(result, Err(DocsError::NotInitialized(_))));
}

#[tokio::test]
async fn unhealthy_embedder_fails_initialize() {
    let dir = TempDir::new().expect("should create temp dir");
    let embedder = Arc::new(LengthEmbedder {
        calls: AtomicUsize::new(0),
        healthy: false,
    });
    let mut indexer = BatchIndexer::with_store_path(&dir.path().join("vectors"), embedder);
    assert!(indexer.initialize().await.is_err());
    assert!(!indexer.is_initialized());
}

#[tokio::test]
async fn failing_units_are_skipped() {
    let dir = TempDir::new().expect("should create temp dir");
    let (indexer, embedder) = initialized(&dir).await;

    let stats = indexer
        .index(&FakeSource {
            units: vec!["a", "fail", "empty", "b"],
        })
        .await
        .expect("should index");

    assert_eq!(stats.units_discovered, 4);
    assert_eq!(stats.units_processed, 3);
    assert_eq!(stats.units_failed, 1);
    assert_eq!(stats.records_written, 4);
    assert_eq!(stats.table_name, "fake_table");
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);

    let store = VectorStore::open(&dir.path().join("vectors"))
        .await
        .expect("should open store");
    assert_eq!(store.count_rows("fake_table").await.expect("should count"), 4);
}

#[tokio::test]
async fn reindexing_produces_same_ids() {
    let dir = TempDir::new().expect("should create temp dir");
    let (indexer, _embedder) = initialized(&dir).await;
    let source = FakeSource {
        units: vec!["a", "b"],
    };

    indexer.index(&source).await.expect("should index");
    let store = VectorStore::open(&dir.path().join("vectors"))
        .await
        .expect("should open store");
    let mut first: Vec<String> = store
        .query::<SourceChunkRecord>("fake_table", None, None)
        .await
        .expect("should query")
        .into_iter()
        .map(|r| r.id)
        .collect();

    indexer.index(&source).await.expect("should index again");
    let mut second: Vec<String> = store
        .query::<SourceChunkRecord>("fake_table", None, None)
        .await
        .expect("should query")
        .into_iter()
        .map(|r| r.id)
        .collect();

    first.sort();
    second.sort();
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[tokio::test]
async fn empty_run_creates_empty_table() {
    let dir = TempDir::new().expect("should create temp dir");
    let (indexer, _embedder) = initialized(&dir).await;

    let stats = indexer
        .index(&FakeSource { units: vec![] })
        .await
        .expect("should index");
    assert_eq!(stats.records_written, 0);

    let store = VectorStore::open(&dir.path().join("vectors"))
        .await
        .expect("should open store");
    assert!(store.has_table("fake_table").await.expect("should list tables"));
    assert_eq!(
        store.vector_dimension("fake_table").await.expect("should read dimension"),
        3
    );
}

#[tokio::test]
async fn close_is_safe_without_initialize() {
    let dir = TempDir::new().expect("should create temp dir");
    let mut indexer = BatchIndexer::with_store_path(&dir.path().join("vectors"), Arc::new(LengthEmbedder::new()));
    indexer.close();
    assert!(!indexer.is_initialized());

    let (mut ready, _embedder) = initialized(&dir).await;
    ready.close();
    assert!(!ready.is_initialized());
    let result = ready.index(&FakeSource { units: vec!["a"] }).await;
    assert!(matches!(result, Err(DocsError::NotInitialized(_))));
}

#[tokio::test]
async fn extraction_runs_off_the_runtime_thread() {
    let dir = TempDir::new().expect("should create temp dir");
    let (indexer, _embedder) = initialized(&dir).await;
    let threads = Arc::new(Mutex::new(Vec::new()));
    let source = ThreadRecordingSource {
        inner: FakeSource { units: vec!["a", "b"] },
        threads: Arc::clone(&threads),
    };

    let stats = indexer.index(&source).await.expect("should index");
    assert_eq!(stats.units_processed, 2);

    let runtime_thread = thread::current().id();
    let seen = threads.lock().expect("should lock thread list");
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|id| *id != runtime_thread));
}

#[tokio::test]
async fn panicking_extraction_counts_as_failed_unit() {
    let dir = TempDir::new().expect("should create temp dir");
    let (indexer, _embedder) = initialized(&dir).await;
    let source = ThreadRecordingSource {
        inner: FakeSource {
            units: vec!["a", "panic", "b"],
        },
        threads: Arc::new(Mutex::new(Vec::new())),
    };

    let stats = indexer.index(&source).await.expect("should index");
    assert_eq!(stats.units_processed, 2);
    assert_eq!(stats.units_failed, 1);
    assert_eq!(stats.records_written, 4);
}
