use super::*;
use git2::{Commit, Signature};
use tempfile::TempDir;

fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> String {
    let workdir = repo.workdir().expect("should have a working directory");
    std::fs::write(workdir.join(name), content).expect("should write file");

    let mut index = repo.index().expect("should open index");
    index.add_path(Path::new(name)).expect("should stage file");
    index.write().expect("should write index");
    let tree_id = index.write_tree().expect("should write tree");
    let tree = repo.find_tree(tree_id).expect("should find tree");

    let signature = Signature::now("Docs Bot", "docs@example.com").expect("should build signature");
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&Commit<'_>> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .expect("should commit")
        .to_string()
}

fn origin(dir: &TempDir) -> (Repository, RepositoryConfig) {
    let path = dir.path().join("origin");
    let repo = Repository::init(&path).expect("should init origin");
    commit_file(&repo, "README.md", "# Docs\n", "initial");
    let config = RepositoryConfig {
        name: "Documentation".to_string(),
        url: path.to_string_lossy().to_string(),
        shallow: true,
        branch: None,
    };
    (repo, config)
}

fn manager(dir: &TempDir, repositories: Vec<RepositoryConfig>) -> RepositoryManager {
    RepositoryManager::with_repositories(dir.path().join("repositories"), repositories)
}

#[test]
fn status_display_uses_short_shas() {
    let status = SyncStatus::Updated {
        from: "0123456789abcdef".to_string(),
        to: "fedcba9876543210".to_string(),
    };
    assert_eq!(status.to_string(), "updated 01234567 -> fedcba98");
    assert_eq!(
        SyncStatus::UpToDate {
            commit: "abc".to_string()
        }
        .to_string(),
        "up to date at abc"
    );
}

#[test]
fn local_urls_are_detected() {
    let dir = TempDir::new().expect("should create temp dir");
    assert!(is_local("file:///tmp/repo"));
    assert!(is_local(&dir.path().to_string_lossy()));
    assert!(!is_local("https://github.com/BabylonJS/Documentation.git"));
}

#[tokio::test]
async fn sync_clones_missing_repository() {
    let dir = TempDir::new().expect("should create temp dir");
    let (origin_repo, config) = origin(&dir);
    let manager = manager(&dir, vec![config.clone()]);
    assert!(!manager.is_cloned("Documentation"));

    let status = manager.sync(&config).await.expect("should clone");
    let origin_head = origin_repo
        .head()
        .and_then(|head| head.peel_to_commit())
        .expect("should read origin head")
        .id()
        .to_string();

    assert_eq!(status, SyncStatus::Cloned { commit: origin_head.clone() });
    assert!(manager.is_cloned("Documentation"));
    assert_eq!(manager.current_commit("Documentation"), Some(origin_head));
    assert!(manager.repository_path("Documentation").join("README.md").is_file());
}

#[tokio::test]
async fn sync_fast_forwards_existing_repository() {
    let dir = TempDir::new().expect("should create temp dir");
    let (origin_repo, config) = origin(&dir);
    let manager = manager(&dir, vec![config.clone()]);
    manager.sync(&config).await.expect("should clone");

    let unchanged = manager.sync(&config).await.expect("should sync");
    assert!(matches!(unchanged, SyncStatus::UpToDate { .. }));

    let new_head = commit_file(&origin_repo, "page.md", "# Page\n", "add page");
    let updated = manager.sync(&config).await.expect("should sync");
    match updated {
        SyncStatus::Updated { to, .. } => assert_eq!(to, new_head),
        other => panic!("expected an update, got {:?}", other),
    }
    assert!(manager.repository_path("Documentation").join("page.md").is_file());
}

#[tokio::test]
async fn unreachable_origin_keeps_existing_checkout() {
    let dir = TempDir::new().expect("should create temp dir");
    let (_origin_repo, config) = origin(&dir);
    let manager = manager(&dir, vec![config.clone()]);
    manager.sync(&config).await.expect("should clone");

    std::fs::remove_dir_all(dir.path().join("origin")).expect("should remove origin");
    let status = manager.sync(&config).await.expect("should not fail");
    assert!(matches!(status, SyncStatus::PullFailed { .. }));
    assert!(manager.is_cloned("Documentation"));
}

#[tokio::test]
async fn sync_all_reports_each_repository() {
    let dir = TempDir::new().expect("should create temp dir");
    let (_origin_repo, config) = origin(&dir);
    let missing = RepositoryConfig {
        name: "Editor".to_string(),
        url: dir.path().join("no-such-origin").to_string_lossy().to_string(),
        shallow: true,
        branch: None,
    };
    let manager = manager(&dir, vec![config, missing]);

    let outcomes = manager.sync_all().await;
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].name, "Documentation");
    assert!(matches!(outcomes[0].result, Ok(SyncStatus::Cloned { .. })));
    assert_eq!(outcomes[1].name, "Editor");
    assert!(matches!(outcomes[1].result, Err(DocsError::Repository(_))));
}

#[tokio::test]
async fn non_repository_directory_is_refused() {
    let dir = TempDir::new().expect("should create temp dir");
    let (_origin_repo, config) = origin(&dir);
    let manager = manager(&dir, vec![config.clone()]);
    let target = manager.repository_path("Documentation");
    std::fs::create_dir_all(&target).expect("should create target");
    std::fs::write(target.join("stray.txt"), "not git").expect("should write stray file");

    let result = manager.sync(&config).await;
    assert!(matches!(result, Err(DocsError::Repository(_))));
}
