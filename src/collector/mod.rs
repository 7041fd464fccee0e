//! Evidence collector: fetches repository facts and assembles the
//! bounded evidence bundle.
//!
//! Independent fetches are issued concurrently and awaited jointly;
//! per-commit enrichment and per-file content fetches run as bounded
//! concurrent batches. A single failed enrichment is logged and
//! swallowed — partial evidence is expected. Only two conditions abort
//! the whole collection: the repository does not exist, or the host is
//! rate-limited with no usable credential left.

pub mod github;

pub use github::GithubClient;

use async_trait::async_trait;
use futures::future::join_all;
use indexmap::IndexMap;
use thiserror::Error;

use crate::constants::{
    ENRICHED_COMMITS, FILE_EXCERPT_CHARS, MAX_BRANCHES, MAX_COMMITS, MAX_CONTRIBUTORS, MAX_PULLS,
    MAX_TREE_ENTRIES,
};
use crate::models::{
    BranchRecord, CommitRecord, ContributorRecord, EvidenceBundle, PullRecord, RepoMetadata,
    RepositoryFile, TreeEntry,
};
use crate::ranker;

/// Errors that abort a collection.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("not found: {0} (missing or private)")]
    NotFound(String),

    #[error("repository host rate-limited with no usable credential")]
    CredentialsExhausted,

    #[error("repository host request failed: {0}")]
    Request(String),
}

/// Read access to a repository host. Implemented by [`GithubClient`];
/// tests substitute a mock.
#[async_trait]
pub trait RepoHost: Send + Sync {
    async fn metadata(&self, owner: &str, repo: &str) -> Result<RepoMetadata, CollectError>;
    async fn commits(
        &self,
        owner: &str,
        repo: &str,
        limit: u32,
    ) -> Result<Vec<CommitRecord>, CollectError>;
    async fn commit_detail(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<CommitRecord, CollectError>;
    async fn pulls(
        &self,
        owner: &str,
        repo: &str,
        limit: u32,
    ) -> Result<Vec<PullRecord>, CollectError>;
    async fn branches(
        &self,
        owner: &str,
        repo: &str,
        limit: u32,
    ) -> Result<Vec<BranchRecord>, CollectError>;
    async fn contributors(
        &self,
        owner: &str,
        repo: &str,
        limit: u32,
    ) -> Result<Vec<ContributorRecord>, CollectError>;
    async fn tree(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        max_entries: usize,
    ) -> Result<Vec<TreeEntry>, CollectError>;
    async fn readme(&self, owner: &str, repo: &str) -> Result<Option<String>, CollectError>;
    async fn languages(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<IndexMap<String, u64>, CollectError>;
    async fn file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<String, CollectError>;
}

/// Collect a best-effort evidence bundle for one repository.
pub async fn collect(
    host: &dyn RepoHost,
    owner: &str,
    repo: &str,
) -> Result<EvidenceBundle, CollectError> {
    // The metadata call is the hard gate: not-found and
    // rate-limited-with-no-credential abort everything.
    let metadata = host.metadata(owner, repo).await?;
    let default_branch = metadata.default_branch.clone();

    // Independent fetches, awaited jointly. An empty repository (no
    // default branch) skips tree/commit/contributor fetches entirely.
    let (commits, tree, contributors, pulls, branches, readme, languages) = match &default_branch {
        Some(branch) => {
            let (commits, tree, contributors, pulls, branches, readme, languages) = tokio::join!(
                host.commits(owner, repo, MAX_COMMITS),
                host.tree(owner, repo, branch, MAX_TREE_ENTRIES),
                host.contributors(owner, repo, MAX_CONTRIBUTORS),
                host.pulls(owner, repo, MAX_PULLS),
                host.branches(owner, repo, MAX_BRANCHES),
                host.readme(owner, repo),
                host.languages(owner, repo),
            );
            (
                or_warn("commits", commits),
                or_warn("file tree", tree),
                or_warn("contributors", contributors),
                or_warn("pull requests", pulls),
                or_warn("branches", branches),
                or_warn("README", readme),
                or_warn("languages", languages),
            )
        }
        None => {
            let (pulls, branches, readme, languages) = tokio::join!(
                host.pulls(owner, repo, MAX_PULLS),
                host.branches(owner, repo, MAX_BRANCHES),
                host.readme(owner, repo),
                host.languages(owner, repo),
            );
            (
                Vec::new(),
                Vec::new(),
                Vec::new(),
                or_warn("pull requests", pulls),
                or_warn("branches", branches),
                or_warn("README", readme),
                or_warn("languages", languages),
            )
        }
    };

    let commits = enrich_commits(host, owner, repo, commits).await;
    let ranked_files = fetch_ranked_files(host, owner, repo, &tree).await;

    Ok(EvidenceBundle {
        metadata,
        readme_excerpt: readme.map(|r| truncate_chars(&r, FILE_EXCERPT_CHARS)),
        tree,
        languages,
        ranked_files,
        commits,
        pulls,
        branches,
        contributors,
    })
}

/// Enrich the newest commits with stats and patch excerpts via a
/// secondary per-commit fetch; older commits keep base metadata only.
/// A failed enrichment leaves that commit's pre-enrichment shape.
async fn enrich_commits(
    host: &dyn RepoHost,
    owner: &str,
    repo: &str,
    mut commits: Vec<CommitRecord>,
) -> Vec<CommitRecord> {
    let enrich_count = commits.len().min(ENRICHED_COMMITS);
    let details = join_all(
        commits[..enrich_count]
            .iter()
            .map(|c| host.commit_detail(owner, repo, &c.sha)),
    )
    .await;

    for (commit, detail) in commits.iter_mut().zip(details) {
        match detail {
            Ok(enriched) => *commit = enriched,
            Err(e) => eprintln!("Warning: failed to enrich commit {}: {e}", commit.sha),
        }
    }
    commits
}

/// Rank tree entries and fetch content for the winners, truncated to the
/// excerpt cap. A failed or undecodable fetch keeps the file in the
/// bundle without content.
async fn fetch_ranked_files(
    host: &dyn RepoHost,
    owner: &str,
    repo: &str,
    tree: &[TreeEntry],
) -> Vec<RepositoryFile> {
    let winners = ranker::rank(tree);
    let contents = join_all(
        winners
            .iter()
            .map(|entry| host.file_content(owner, repo, &entry.path)),
    )
    .await;

    winners
        .into_iter()
        .zip(contents)
        .map(|(entry, content)| {
            let content_excerpt = match content {
                Ok(text) => Some(truncate_chars(&text, FILE_EXCERPT_CHARS)),
                Err(e) => {
                    eprintln!("Warning: failed to fetch content for {}: {e}", entry.path);
                    None
                }
            };
            RepositoryFile {
                path: entry.path,
                sha: entry.sha,
                size: entry.size,
                content_excerpt,
            }
        })
        .collect()
}

/// Swallow a non-critical fetch failure, keeping the default value.
fn or_warn<T: Default>(what: &str, result: Result<T, CollectError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Warning: failed to fetch {what}: {e}");
            T::default()
        }
    }
}

/// Truncate at a character boundary.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
