
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::chunking::ChunkingConfig;
use crate::embeddings::ollama::DEFAULT_EMBEDDING_DIMENSION;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "BABYLON_MCP_HOME";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default = "default_repositories")]
    pub repositories: Vec<RepositoryConfig>,
    #[serde(default = "default_document_sources")]
    pub document_sources: Vec<DocumentSource>,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "nomic-embed-text:latest".to_string(),
            batch_size: 16,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

/// Table names, content limits and package lists used by the indexers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexingConfig {
    pub docs_table: String,
    pub api_table: String,
    pub source_table: String,
    /// Stored document bodies are cut to this many characters
    pub max_content_chars: usize,
    /// Repository (under the repositories dir) holding the framework sources
    pub source_repository: String,
    /// Browsable URL of `source_repository` at the indexed revision
    pub source_url_base: String,
    pub source_packages: Vec<String>,
    pub api_packages: Vec<String>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            docs_table: "babylon_docs".to_string(),
            api_table: "babylon_api".to_string(),
            source_table: "babylon_source_code".to_string(),
            max_content_chars: 20_000,
            source_repository: "Babylon.js".to_string(),
            source_url_base: "https://github.com/BabylonJS/Babylon.js/blob/master".to_string(),
            source_packages: ["core", "gui", "materials", "loaders", "serializers"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            api_packages: [
                "core",
                "gui",
                "materials",
                "loaders",
                "serializers",
                "inspector",
                "postProcesses",
                "proceduralTextures",
                "addons",
                "smartFilters",
                "smartFilterBlocks",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

/// A git repository mirrored under the repositories directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub shallow: bool,
    #[serde(default)]
    pub branch: Option<String>,
}

/// A named documentation root indexed into the docs table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSource {
    /// Source-domain name, also the record id prefix
    pub name: String,
    /// Root directory, relative to the repositories directory unless absolute
    pub path: PathBuf,
    pub url_prefix: String,
    /// Suffix appended to generated URLs (e.g. `.md` for repository blobs)
    #[serde(default)]
    pub url_extension: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_repositories() -> Vec<RepositoryConfig> {
    let github = |name: &str, branch: Option<&str>| RepositoryConfig {
        name: name.to_string(),
        url: format!("https://github.com/BabylonJS/{}.git", name),
        shallow: true,
        branch: branch.map(str::to_string),
    };
    vec![
        github("Documentation", None),
        github("Babylon.js", None),
        github("havok", None),
        github("Editor", Some("master")),
    ]
}

fn default_document_sources() -> Vec<DocumentSource> {
    vec![
        DocumentSource {
            name: "documentation".to_string(),
            path: PathBuf::from("Documentation/content"),
            url_prefix: "https://doc.babylonjs.com".to_string(),
            url_extension: None,
        },
        DocumentSource {
            name: "source-repo".to_string(),
            path: PathBuf::from("Babylon.js"),
            url_prefix: "https://github.com/BabylonJS/Babylon.js/blob/master".to_string(),
            url_extension: Some(".md".to_string()),
        },
        DocumentSource {
            name: "editor-docs".to_string(),
            path: PathBuf::from("Editor/website/src/app/documentation"),
            url_prefix: "https://editor.babylonjs.com/documentation".to_string(),
            url_extension: None,
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            chunking: ChunkingConfig::default(),
            indexing: IndexingConfig::default(),
            repositories: default_repositories(),
            document_sources: default_document_sources(),
            base_dir: PathBuf::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 8 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid chunk size: {0} lines (must be between 1 and 5000)")]
    InvalidChunkLines(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1}) or windows would skip lines")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid table name: '{0}' (must be non-empty alphanumeric, '_' or '-')")]
    InvalidTableName(String),
    #[error("Invalid content limit: {0} (must be at least 500 characters)")]
    InvalidContentLimit(usize),
    #[error("Duplicate name: {0}")]
    DuplicateName(String),
    #[error("Document source '{0}' has an empty path or URL prefix")]
    IncompleteDocumentSource(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Resolve the configuration directory: `$BABYLON_MCP_HOME`, else `~/.babylon-mcp`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        dirs::home_dir()
            .map(|home| home.join(".babylon-mcp"))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from the default configuration directory
    #[inline]
    pub fn load_default() -> Result<Self> {
        let dir = Self::config_dir().context("Failed to resolve configuration directory")?;
        Self::load(dir)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.chunking.validate()?;
        self.validate_indexing_config()?;
        self.validate_sources()?;
        Ok(())
    }

    fn validate_indexing_config(&self) -> Result<(), ConfigError> {
        let indexing = &self.indexing;

        for table in [
            &indexing.docs_table,
            &indexing.api_table,
            &indexing.source_table,
        ] {
            if !is_valid_table_name(table) {
                return Err(ConfigError::InvalidTableName(table.clone()));
            }
        }

        if indexing.max_content_chars < 500 {
            return Err(ConfigError::InvalidContentLimit(indexing.max_content_chars));
        }

        Ok(())
    }

    fn validate_sources(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for repository in &self.repositories {
            if !seen.insert(repository.name.as_str()) {
                return Err(ConfigError::DuplicateName(repository.name.clone()));
            }
        }

        let mut seen = HashSet::new();
        for source in &self.document_sources {
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateName(source.name.clone()));
            }
            if source.path.as_os_str().is_empty() || source.url_prefix.trim().is_empty() {
                return Err(ConfigError::IncompleteDocumentSource(source.name.clone()));
            }
        }

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Get the path for the vector database directory
    #[inline]
    pub fn vector_database_path(&self) -> PathBuf {
        self.get_base_dir().join("vectors")
    }

    /// Directory the configured repositories are cloned into
    #[inline]
    pub fn repositories_dir(&self) -> PathBuf {
        self.get_base_dir().join("repositories")
    }

    /// Checkout of the framework source repository
    #[inline]
    pub fn source_repository_path(&self) -> PathBuf {
        self.repositories_dir()
            .join(&self.indexing.source_repository)
    }

    /// Resolve a document source root against the repositories directory
    #[inline]
    pub fn document_source_root(&self, source: &DocumentSource) -> PathBuf {
        if source.path.is_absolute() {
            source.path.clone()
        } else {
            self.repositories_dir().join(&source.path)
        }
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }
}

fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(8..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        if protocol != "http" && protocol != "https" {
            return Err(ConfigError::InvalidProtocol(protocol));
        }
        self.protocol = protocol;
        Ok(())
    }

    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let temp_config = OllamaConfig {
            host: host.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.host = host;
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }

    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        if !(8..=4096).contains(&dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimension));
        }
        self.embedding_dimension = dimension;
        Ok(())
    }
}
