use babylon_docs_mcp::Result;
use babylon_docs_mcp::commands::{
    get_document, get_source, index_api, index_documents, index_source, search_api, search_docs,
    search_source, serve_mcp, show_status, sync_repositories,
};
use babylon_docs_mcp::config::{run_interactive_config, show_config};
use babylon_docs_mcp::search::DEFAULT_LIMIT;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "babylon-mcp")]
#[command(about = "Semantic search over Babylon.js documentation, API and source, served over MCP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Clone or update the Babylon.js repositories
    Sync,
    /// Rebuild one of the search tables
    Index {
        #[command(subcommand)]
        target: IndexTarget,
    },
    /// Query the search tables from the command line
    Search {
        #[command(subcommand)]
        target: SearchTarget,
    },
    /// Print a documentation page by URL, path or topic
    GetDoc {
        path: String,
    },
    /// Print a source file of the Babylon.js repository
    GetSource {
        /// Path relative to the repository root, e.g. packages/dev/core/src/scene.ts
        path: String,
        /// First line to print (1-indexed); needs --end
        #[arg(long)]
        start: Option<usize>,
        /// Last line to print (inclusive); needs --start
        #[arg(long)]
        end: Option<usize>,
    },
    /// Start MCP server on stdio
    Serve,
    /// Show Ollama, repository and table status
    Status,
}

#[derive(Subcommand)]
enum IndexTarget {
    /// Documentation and editor pages
    Docs {
        /// Only index these document sources
        #[arg(long, value_delimiter = ',')]
        sources: Vec<String>,
    },
    /// TSDoc of exported declarations
    Api {
        /// Only index these packages
        #[arg(long, value_delimiter = ',')]
        packages: Vec<String>,
    },
    /// Line-window chunks of source files
    Source {
        /// Only index these packages
        #[arg(long, value_delimiter = ',')]
        packages: Vec<String>,
    },
}

#[derive(Subcommand)]
enum SearchTarget {
    Docs {
        query: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    Api {
        query: String,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    Source {
        query: String,
        #[arg(long)]
        package: Option<String>,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Stdout is the MCP transport when serving
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Sync => sync_repositories().await?,
        Commands::Index { target } => {
            match target {
                IndexTarget::Docs { sources } => index_documents(&sources).await?,
                IndexTarget::Api { packages } => index_api(packages).await?,
                IndexTarget::Source { packages } => index_source(packages).await?,
            };
        }
        Commands::Search { target } => match target {
            SearchTarget::Docs {
                query,
                category,
                limit,
            } => search_docs(&query, category, limit).await?,
            SearchTarget::Api { query, limit } => search_api(&query, limit).await?,
            SearchTarget::Source {
                query,
                package,
                limit,
            } => search_source(&query, package, limit).await?,
        },
        Commands::GetDoc { path } => get_document(&path).await?,
        Commands::GetSource { path, start, end } => get_source(&path, start, end).await?,
        Commands::Serve => serve_mcp().await?,
        Commands::Status => show_status().await?,
    }

    Ok(())
}
