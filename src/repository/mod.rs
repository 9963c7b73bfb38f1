//! Local mirrors of the Babylon.js git repositories.
//!
//! Every configured repository lives at `<repositories_dir>/<name>`. Syncing
//! clones a missing mirror (shallow unless configured otherwise) and
//! fast-forwards an existing one. All git work runs on the blocking pool.

#[cfg(test)]
mod tests;

use std::fmt;
use std::path::{Path, PathBuf};

use git2::{
    AutotagOption, FetchOptions, ProxyOptions, Repository, build::CheckoutBuilder,
    build::RepoBuilder,
};
use tracing::{debug, info, warn};

use crate::config::{Config, RepositoryConfig};
use crate::{DocsError, Result};

/// What a sync did to one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Cloned { commit: String },
    Updated { from: String, to: String },
    UpToDate { commit: String },
    /// The mirror exists but could not be updated; its current checkout is kept
    PullFailed { reason: String },
}

impl fmt::Display for SyncStatus {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloned { commit } => write!(f, "cloned at {}", short_sha(commit)),
            Self::Updated { from, to } => {
                write!(f, "updated {} -> {}", short_sha(from), short_sha(to))
            }
            Self::UpToDate { commit } => write!(f, "up to date at {}", short_sha(commit)),
            Self::PullFailed { reason } => write!(f, "update failed, keeping checkout: {}", reason),
        }
    }
}

fn short_sha(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}

/// Per-repository result of [`RepositoryManager::sync_all`]
#[derive(Debug)]
pub struct SyncOutcome {
    pub name: String,
    pub path: PathBuf,
    pub result: Result<SyncStatus>,
}

pub struct RepositoryManager {
    repositories_dir: PathBuf,
    repositories: Vec<RepositoryConfig>,
}

impl RepositoryManager {
    #[inline]
    pub fn new(config: &Config) -> Self {
        Self::with_repositories(config.repositories_dir(), config.repositories.clone())
    }

    #[inline]
    pub fn with_repositories(repositories_dir: PathBuf, repositories: Vec<RepositoryConfig>) -> Self {
        Self {
            repositories_dir,
            repositories,
        }
    }

    #[inline]
    pub fn repositories(&self) -> &[RepositoryConfig] {
        &self.repositories
    }

    #[inline]
    pub fn repository_path(&self, name: &str) -> PathBuf {
        self.repositories_dir.join(name)
    }

    /// Whether a git checkout exists for the named repository
    #[inline]
    pub fn is_cloned(&self, name: &str) -> bool {
        Repository::open(self.repository_path(name)).is_ok()
    }

    /// Commit currently checked out, if the mirror exists
    #[inline]
    pub fn current_commit(&self, name: &str) -> Option<String> {
        head_commit(&self.repository_path(name)).ok()
    }

    /// Clone or update one repository
    ///
    /// Clone failures are errors. Update failures leave the existing
    /// checkout in place and are reported as [`SyncStatus::PullFailed`].
    #[inline]
    pub async fn sync(&self, repository: &RepositoryConfig) -> Result<SyncStatus> {
        let target = self.repository_path(&repository.name);
        let repository = repository.clone();

        tokio::task::spawn_blocking(move || sync_blocking(&repository, &target))
            .await
            .map_err(|e| DocsError::Repository(format!("Sync task failed: {}", e)))?
    }

    /// Sync every configured repository in order, collecting each outcome
    #[inline]
    pub async fn sync_all(&self) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::with_capacity(self.repositories.len());
        for repository in &self.repositories {
            info!("Syncing {} from {}", repository.name, repository.url);
            let result = self.sync(repository).await;
            match &result {
                Ok(status) => info!("{}: {}", repository.name, status),
                Err(e) => warn!("{}: {}", repository.name, e),
            }
            outcomes.push(SyncOutcome {
                name: repository.name.clone(),
                path: self.repository_path(&repository.name),
                result,
            });
        }
        outcomes
    }
}

fn sync_blocking(repository: &RepositoryConfig, target: &Path) -> Result<SyncStatus> {
    if Repository::open(target).is_ok() {
        return Ok(match update_repository(target, repository) {
            Ok(status) => status,
            Err(e) => {
                warn!("Could not update {}: {}", repository.name, e);
                SyncStatus::PullFailed {
                    reason: e.to_string(),
                }
            }
        });
    }

    if target.exists() && target.read_dir().is_ok_and(|mut entries| entries.next().is_some()) {
        return Err(DocsError::Repository(format!(
            "{} exists but is not a git repository",
            target.display()
        )));
    }

    let commit = clone_repository(repository, target)?;
    Ok(SyncStatus::Cloned { commit })
}

fn is_local(url: &str) -> bool {
    url.starts_with("file://") || Path::new(url).exists()
}

fn fetch_options(repository: &RepositoryConfig) -> FetchOptions<'static> {
    let mut options = FetchOptions::new();
    // libgit2 cannot shallow-fetch over the local transport
    if repository.shallow && !is_local(&repository.url) {
        options.depth(1);
    }
    options.download_tags(AutotagOption::None);

    let mut proxy = ProxyOptions::new();
    proxy.auto();
    options.proxy_options(proxy);
    options
}

fn clone_repository(repository: &RepositoryConfig, target: &Path) -> Result<String> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options(repository));
    if let Some(branch) = &repository.branch {
        builder.branch(branch);
    }

    debug!("Cloning {} into {:?}", repository.url, target);
    builder.clone(&repository.url, target).map_err(|e| {
        DocsError::Repository(format!("Failed to clone {}: {}", repository.url, e))
    })?;

    head_commit(target)
}

fn update_repository(target: &Path, repository: &RepositoryConfig) -> Result<SyncStatus> {
    let git = |operation: &str, e: git2::Error| {
        DocsError::Repository(format!("Failed to {} {}: {}", operation, repository.name, e))
    };

    let repo = Repository::open(target).map_err(|e| git("open", e))?;
    let before = head_commit(target)?;
    let branch = match &repository.branch {
        Some(branch) => branch.clone(),
        None => repo
            .head()
            .map_err(|e| git("read HEAD of", e))?
            .shorthand()
            .map(str::to_string)
            .ok_or_else(|| {
                DocsError::Repository(format!("{} has a detached HEAD", repository.name))
            })?,
    };

    let mut remote = repo.find_remote("origin").map_err(|e| git("find origin of", e))?;
    remote
        .fetch(&[branch.as_str()], Some(&mut fetch_options(repository)), None)
        .map_err(|e| git("fetch", e))?;

    let fetch_head = repo
        .find_reference("FETCH_HEAD")
        .map_err(|e| git("read FETCH_HEAD of", e))?;
    let fetched = repo
        .reference_to_annotated_commit(&fetch_head)
        .map_err(|e| git("resolve FETCH_HEAD of", e))?;
    let (analysis, _) = repo
        .merge_analysis(&[&fetched])
        .map_err(|e| git("analyze", e))?;

    if analysis.is_up_to_date() {
        return Ok(SyncStatus::UpToDate { commit: before });
    }
    if !analysis.is_fast_forward() {
        return Err(DocsError::Repository(format!(
            "{} has diverged from origin/{}",
            repository.name, branch
        )));
    }

    let reference_name = format!("refs/heads/{}", branch);
    let mut reference = repo
        .find_reference(&reference_name)
        .map_err(|e| git("find branch of", e))?;
    reference
        .set_target(fetched.id(), "fast-forward")
        .map_err(|e| git("fast-forward", e))?;
    repo.set_head(&reference_name)
        .map_err(|e| git("set HEAD of", e))?;
    repo.checkout_head(Some(CheckoutBuilder::default().force()))
        .map_err(|e| git("check out", e))?;

    Ok(SyncStatus::Updated {
        from: before,
        to: fetched.id().to_string(),
    })
}

fn head_commit(path: &Path) -> Result<String> {
    let repo = Repository::open(path)
        .map_err(|e| DocsError::Repository(format!("Failed to open {:?}: {}", path, e)))?;
    let commit = repo
        .head()
        .and_then(|head| head.peel_to_commit())
        .map_err(|e| DocsError::Repository(format!("Failed to read HEAD of {:?}: {}", path, e)))?;
    Ok(commit.id().to_string())
}
