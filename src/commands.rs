use anyhow::{Context, Result};
use console::style;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::{Embedder, OllamaEmbedder};
use crate::indexer::api::ApiSource;
use crate::indexer::documents::DocumentSourceSet;
use crate::indexer::source_code::SourceCodeSource;
use crate::indexer::{BatchIndexer, IndexSource, IndexingStats};
use crate::mcp::build_server;
use crate::records::truncate_chars;
use crate::repository::RepositoryManager;
use crate::search::{EngineSettings, QueryEngine, SearchOptions, SourceSearchOptions};

fn embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedder = OllamaEmbedder::new(&config.ollama).context("Failed to create Ollama client")?;
    Ok(Arc::new(embedder))
}

async fn open_engine(config: &Config) -> Result<QueryEngine> {
    QueryEngine::connect(EngineSettings::from_config(config), embedder(config)?)
        .await
        .context("Failed to open the search index")
}

/// Clone or update every configured repository
#[inline]
pub async fn sync_repositories() -> Result<()> {
    let config = Config::load_default()?;
    let manager = RepositoryManager::new(&config);

    println!(
        "Syncing {} repositories into {}",
        manager.repositories().len(),
        config.repositories_dir().display()
    );
    let outcomes = manager.sync_all().await;

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(status) => println!("  {} {}: {}", style("✓").green(), outcome.name, status),
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", style("✗").red(), outcome.name, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} repositories failed to sync", failed, outcomes.len());
    }
    Ok(())
}

async fn run_index<S: IndexSource>(config: &Config, source: &S) -> Result<IndexingStats> {
    let mut indexer = BatchIndexer::new(config, embedder(config)?);
    indexer
        .initialize()
        .await
        .context("Failed to initialize indexer")?;

    let stats = indexer.index(source).await;
    indexer.close();
    let stats = stats.with_context(|| format!("Indexing {} failed", source.name()))?;

    println!(
        "Indexed {}: {} records into '{}' ({} of {} files, {} failed) in {:.1}s",
        stats.source,
        stats.records_written,
        stats.table_name,
        stats.units_processed,
        stats.units_discovered,
        stats.units_failed,
        stats.duration.as_secs_f64()
    );
    Ok(stats)
}

/// Rebuild the documentation table, optionally from a subset of sources
#[inline]
pub async fn index_documents(sources: &[String]) -> Result<IndexingStats> {
    let config = Config::load_default()?;
    let set = DocumentSourceSet::from_config(&config).only(sources);
    if set.sources().is_empty() {
        anyhow::bail!("No document sources selected");
    }
    run_index(&config, &set).await
}

/// Rebuild the API table, optionally for a subset of packages
#[inline]
pub async fn index_api(packages: Vec<String>) -> Result<IndexingStats> {
    let config = Config::load_default()?;
    let mut source = ApiSource::from_config(&config);
    if !packages.is_empty() {
        source = source.with_packages(packages);
    }
    run_index(&config, &source).await
}

/// Rebuild the source-code table, optionally for a subset of packages
#[inline]
pub async fn index_source(packages: Vec<String>) -> Result<IndexingStats> {
    let config = Config::load_default()?;
    let mut source = SourceCodeSource::from_config(&config)?;
    if !packages.is_empty() {
        source = source.with_packages(packages);
    }
    run_index(&config, &source).await
}

#[inline]
pub async fn search_docs(query: &str, category: Option<String>, limit: usize) -> Result<()> {
    let config = Config::load_default()?;
    let engine = open_engine(&config).await?;
    let results = engine.search(query, &SearchOptions { limit, category }).await?;

    if results.is_empty() {
        println!("No documentation found for \"{}\"", query);
        return Ok(());
    }
    for (index, result) in results.iter().enumerate() {
        println!(
            "{}. {} [{}] ({:.1}%)",
            index + 1,
            style(&result.title).bold(),
            result.category,
            result.score * 100.0
        );
        println!("   {}", result.url);
        println!("   {}", result.content);
        println!();
    }
    Ok(())
}

#[inline]
pub async fn search_api(query: &str, limit: usize) -> Result<()> {
    let config = Config::load_default()?;
    let engine = open_engine(&config).await?;
    let results = engine.search_api(query, limit).await?;

    if results.is_empty() {
        println!("No API documentation found for \"{}\"", query);
        return Ok(());
    }
    for (index, hit) in results.iter().enumerate() {
        let entry = &hit.record;
        println!(
            "{}. {} {} ({:.1}%)",
            index + 1,
            entry.kind,
            style(&entry.full_name).bold(),
            hit.score * 100.0
        );
        if !entry.summary.is_empty() {
            println!("   {}", entry.summary);
        }
        println!("   {}:{}", entry.source_file, entry.source_line);
        let see = entry.see_list();
        if !see.is_empty() {
            println!("   See also: {}", see.join(", "));
        }
        println!();
    }
    Ok(())
}

#[inline]
pub async fn search_source(query: &str, package: Option<String>, limit: usize) -> Result<()> {
    let config = Config::load_default()?;
    let engine = open_engine(&config).await?;
    let options = SourceSearchOptions {
        package,
        limit,
        table_name: None,
    };
    let results = engine.search_source_code(query, &options).await?;

    if results.is_empty() {
        println!("No source code found for \"{}\"", query);
        return Ok(());
    }
    for (index, hit) in results.iter().enumerate() {
        let chunk = &hit.record;
        println!(
            "{}. {}:{}-{} [{}] ({:.1}%)",
            index + 1,
            style(&chunk.file_path).bold(),
            chunk.start_line,
            chunk.end_line,
            chunk.package,
            hit.score * 100.0
        );
        println!("{}", truncate_chars(&chunk.content, 400));
        println!();
    }
    Ok(())
}

#[inline]
pub async fn get_document(path: &str) -> Result<()> {
    let config = Config::load_default()?;
    let engine = open_engine(&config).await?;

    match engine.get_document_by_path(path).await? {
        Some(document) => {
            println!("{}", style(&document.title).bold());
            println!("{}", document.url);
            println!();
            println!("{}", document.content);
        }
        None => println!("Document not found: {}", path),
    }
    Ok(())
}

#[inline]
pub async fn get_source(path: &str, start_line: Option<usize>, end_line: Option<usize>) -> Result<()> {
    let config = Config::load_default()?;
    let engine = QueryEngine::new(EngineSettings::from_config(&config));

    match engine.get_source_file(path, start_line, end_line).await? {
        Some(source) => println!("{}", source),
        None => println!("Source file not found: {}", path),
    }
    Ok(())
}

/// Report configuration, Ollama reachability and table sizes
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load_default().unwrap_or_default();

    println!("Babylon MCP Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("Ollama:");
    match OllamaEmbedder::new(&config.ollama) {
        Ok(embedder) => match embedder.health_check().await {
            Ok(()) => {
                println!(
                    "   {} Connected ({}:{})",
                    style("✓").green(),
                    config.ollama.host,
                    config.ollama.port
                );
                println!("   Model: {}", config.ollama.model);
            }
            Err(e) => println!("   {} Unhealthy - {}", style("!").yellow(), e),
        },
        Err(e) => println!("   {} Failed to connect - {}", style("✗").red(), e),
    }
    println!();

    println!("Repositories ({}):", config.repositories_dir().display());
    let manager = RepositoryManager::new(&config);
    for repository in manager.repositories() {
        match manager.current_commit(&repository.name) {
            Some(commit) => println!(
                "   {} {} at {}",
                style("✓").green(),
                repository.name,
                commit.get(..8).unwrap_or(&commit)
            ),
            None => println!("   {} {} not cloned", style("✗").red(), repository.name),
        }
    }
    println!();

    println!("Vector database ({}):", config.vector_database_path().display());
    match VectorStore::new(&config).await {
        Ok(store) => {
            for table in [
                &config.indexing.docs_table,
                &config.indexing.api_table,
                &config.indexing.source_table,
            ] {
                match store.count_rows(table).await {
                    Ok(rows) => println!("   {} {}: {} rows", style("✓").green(), table, rows),
                    Err(_) => println!("   {} {}: not indexed", style("✗").red(), table),
                }
            }
        }
        Err(e) => println!("   {} Failed to open - {}", style("✗").red(), e),
    }
    Ok(())
}

/// Serve the MCP tools on stdio until the client disconnects or Ctrl+C
///
/// Stdout carries the protocol, so all human-facing output goes to stderr.
#[inline]
pub async fn serve_mcp() -> Result<()> {
    let config = Config::load_default()?;
    let engine = Arc::new(open_engine(&config).await?);
    let server = build_server(engine).await;

    eprintln!(
        "MCP server ready with tools: {}",
        server.tool_names().await.join(", ")
    );
    info!("Serving {} on stdio", server.server_info().name);

    tokio::select! {
        result = server.serve_stdio() => {
            if let Err(e) = result {
                error!("MCP server error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Received interrupt signal, shutting down...");
        }
    }
    Ok(())
}
