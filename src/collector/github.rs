//! GitHub REST client implementing [`RepoHost`].
//!
//! All calls go through the request controller so tokens rotate on
//! 403/429. File and README content arrives base64-encoded and is
//! decoded to UTF-8 text.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::constants::{GITHUB_API_URL, PATCH_EXCERPT_CHARS, REPO_HOST_MAX_ATTEMPTS};
use crate::models::{
    BranchRecord, CommitRecord, CommitStats, ContributorRecord, ModifiedFile, PullRecord,
    RepoMetadata, TreeEntry,
};
use crate::net::{RequestController, RequestError};
use crate::vault::ServiceClass;

use super::{CollectError, RepoHost, truncate_chars};

/// GitHub REST API client.
pub struct GithubClient {
    controller: RequestController,
    base_url: String,
}

impl GithubClient {
    pub fn new(controller: RequestController) -> Self {
        Self::with_base_url(controller, GITHUB_API_URL)
    }

    /// Point the client at a non-default API root (tests, GHE).
    pub fn with_base_url(controller: RequestController, base_url: impl Into<String>) -> Self {
        Self {
            controller,
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CollectError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .controller
            .execute(ServiceClass::RepoHost, REPO_HOST_MAX_ATTEMPTS, |client| {
                client
                    .get(&url)
                    .header("accept", "application/vnd.github+json")
            })
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CollectError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(CollectError::Request(format!("{path} returned {status}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| CollectError::Request(format!("{path}: invalid JSON: {e}")))
    }
}

fn map_request_error(err: RequestError) -> CollectError {
    match err {
        RequestError::NoUsableCredential(_) | RequestError::Exhausted { .. } => {
            CollectError::CredentialsExhausted
        }
        RequestError::Http(e) => CollectError::Request(e.to_string()),
    }
}

#[async_trait]
impl RepoHost for GithubClient {
    async fn metadata(&self, owner: &str, repo: &str) -> Result<RepoMetadata, CollectError> {
        self.get_json(&format!("/repos/{owner}/{repo}"))
            .await
            .map_err(|e| match e {
                // Re-key the resource so the user sees the repo name.
                CollectError::NotFound(_) => CollectError::NotFound(format!("{owner}/{repo}")),
                other => other,
            })
    }

    async fn commits(
        &self,
        owner: &str,
        repo: &str,
        limit: u32,
    ) -> Result<Vec<CommitRecord>, CollectError> {
        let raw: Vec<ApiCommit> = self
            .get_json(&format!("/repos/{owner}/{repo}/commits?per_page={limit}"))
            .await?;
        Ok(raw.into_iter().map(ApiCommit::into_record).collect())
    }

    async fn commit_detail(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<CommitRecord, CollectError> {
        let raw: ApiCommit = self
            .get_json(&format!("/repos/{owner}/{repo}/commits/{sha}"))
            .await?;
        Ok(raw.into_record())
    }

    async fn pulls(
        &self,
        owner: &str,
        repo: &str,
        limit: u32,
    ) -> Result<Vec<PullRecord>, CollectError> {
        let raw: Vec<ApiPull> = self
            .get_json(&format!(
                "/repos/{owner}/{repo}/pulls?state=all&per_page={limit}"
            ))
            .await?;
        Ok(raw.into_iter().map(ApiPull::into_record).collect())
    }

    async fn branches(
        &self,
        owner: &str,
        repo: &str,
        limit: u32,
    ) -> Result<Vec<BranchRecord>, CollectError> {
        let raw: Vec<ApiBranch> = self
            .get_json(&format!("/repos/{owner}/{repo}/branches?per_page={limit}"))
            .await?;
        Ok(raw
            .into_iter()
            .map(|b| BranchRecord { name: b.name })
            .collect())
    }

    async fn contributors(
        &self,
        owner: &str,
        repo: &str,
        limit: u32,
    ) -> Result<Vec<ContributorRecord>, CollectError> {
        let raw: Vec<ApiContributor> = self
            .get_json(&format!(
                "/repos/{owner}/{repo}/contributors?per_page={limit}"
            ))
            .await?;
        Ok(raw
            .into_iter()
            .map(|c| ContributorRecord {
                login: c.login,
                contributions: c.contributions,
            })
            .collect())
    }

    async fn tree(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        max_entries: usize,
    ) -> Result<Vec<TreeEntry>, CollectError> {
        let raw: ApiTree = self
            .get_json(&format!(
                "/repos/{owner}/{repo}/git/trees/{branch}?recursive=1"
            ))
            .await?;
        Ok(raw
            .tree
            .into_iter()
            .filter(|node| node.node_type == "blob")
            .take(max_entries)
            .map(|node| TreeEntry {
                path: node.path,
                sha: node.sha,
                size: node.size,
            })
            .collect())
    }

    async fn readme(&self, owner: &str, repo: &str) -> Result<Option<String>, CollectError> {
        let raw: ApiContent = match self.get_json(&format!("/repos/{owner}/{repo}/readme")).await {
            Ok(raw) => raw,
            // A repository without a README is ordinary, not an error.
            Err(CollectError::NotFound(_)) => return Ok(None),
            Err(other) => return Err(other),
        };
        Ok(decode_content(&raw.content).ok())
    }

    async fn languages(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<IndexMap<String, u64>, CollectError> {
        self.get_json(&format!("/repos/{owner}/{repo}/languages"))
            .await
    }

    async fn file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<String, CollectError> {
        let raw: ApiContent = self
            .get_json(&format!("/repos/{owner}/{repo}/contents/{path}"))
            .await?;
        decode_content(&raw.content)
    }
}

/// Decode base64 file content (the host inserts newlines every 60
/// characters) into UTF-8 text.
fn decode_content(content: &str) -> Result<String, CollectError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact)
        .map_err(|e| CollectError::Request(format!("undecodable base64 content: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| CollectError::Request(format!("content is not UTF-8 text: {e}")))
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiCommit {
    sha: String,
    commit: ApiCommitInner,
    #[serde(default)]
    stats: Option<ApiCommitStats>,
    #[serde(default)]
    files: Option<Vec<ApiCommitFile>>,
}

#[derive(Debug, Deserialize)]
struct ApiCommitInner {
    #[serde(default)]
    message: String,
    #[serde(default)]
    author: Option<ApiCommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct ApiCommitAuthor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    date: String,
}

#[derive(Debug, Deserialize)]
struct ApiCommitStats {
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
}

#[derive(Debug, Deserialize)]
struct ApiCommitFile {
    filename: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    patch: Option<String>,
}

impl ApiCommit {
    fn into_record(self) -> CommitRecord {
        let author = self.commit.author.unwrap_or(ApiCommitAuthor {
            name: "(unknown)".to_string(),
            date: String::new(),
        });
        CommitRecord {
            sha: self.sha,
            message: self.commit.message,
            author_name: author.name,
            author_date: author.date,
            stats: self.stats.map(|s| CommitStats {
                additions: s.additions,
                deletions: s.deletions,
            }),
            modified_files: self.files.map(|files| {
                files
                    .into_iter()
                    .map(|f| ModifiedFile {
                        filename: f.filename,
                        status: f.status,
                        patch_excerpt: f
                            .patch
                            .map(|p| truncate_chars(&p, PATCH_EXCERPT_CHARS)),
                    })
                    .collect()
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiPull {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    user: Option<ApiUser>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    merged_at: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

impl ApiPull {
    fn into_record(self) -> PullRecord {
        PullRecord {
            number: self.number,
            title: self.title,
            state: self.state,
            author: self
                .user
                .map(|u| u.login)
                .unwrap_or_else(|| "(unknown)".to_string()),
            created_at: self.created_at,
            merged_at: self.merged_at,
            body_excerpt: self.body.map(|b| truncate_chars(&b, 500)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiBranch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiContributor {
    login: String,
    #[serde(default)]
    contributions: u64,
}

#[derive(Debug, Deserialize)]
struct ApiTree {
    #[serde(default)]
    tree: Vec<ApiTreeNode>,
}

#[derive(Debug, Deserialize)]
struct ApiTreeNode {
    path: String,
    #[serde(rename = "type")]
    node_type: String,
    sha: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct ApiContent {
    #[serde(default)]
    content: String,
}
