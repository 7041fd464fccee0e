//! Repository evidence types.
//!
//! Everything the evidence collector fetches from the repository host is
//! normalised into these shapes before ranking and prompt assembly.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Top-level repository metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Missing on empty repositories — gates tree/commit/contributor fetches.
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub pushed_at: Option<String>,
}

/// One blob entry from the recursive file tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
}

impl TreeEntry {
    /// Path depth: number of path components.
    pub fn depth(&self) -> usize {
        self.path.split('/').count()
    }

    /// Lowercased extension, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
    }

    /// Bare filename (last path component).
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A repository file selected as evidence; content is populated only for
/// ranked files and truncated to a fixed character cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryFile {
    pub path: String,
    pub sha: String,
    pub size: u64,
    pub content_excerpt: Option<String>,
}

/// Additions/deletions for an enriched commit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CommitStats {
    pub additions: u64,
    pub deletions: u64,
}

/// A file touched by an enriched commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifiedFile {
    pub filename: String,
    pub status: String,
    /// Truncated unified-diff excerpt, when the host supplied a patch.
    pub patch_excerpt: Option<String>,
}

/// A single commit. Only the newest commits carry stats and modified
/// files; older ones keep base metadata only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_date: String,
    #[serde(default)]
    pub stats: Option<CommitStats>,
    #[serde(default)]
    pub modified_files: Option<Vec<ModifiedFile>>,
}

/// A pull request (any state).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRecord {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub author: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub body_excerpt: Option<String>,
}

/// A branch name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRecord {
    pub name: String,
}

/// A contributor with their commit count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorRecord {
    pub login: String,
    pub contributions: u64,
}

/// The assembled, bounded set of evidence passed to the prompt
/// assembler. Built once per review request and discarded after the
/// prompt is rendered.
#[derive(Debug, Clone, Default)]
pub struct EvidenceBundle {
    pub metadata: RepoMetadata,
    pub readme_excerpt: Option<String>,
    pub tree: Vec<TreeEntry>,
    /// Language → byte count, in the host's order.
    pub languages: IndexMap<String, u64>,
    /// Top-ranked files with content excerpts.
    pub ranked_files: Vec<RepositoryFile>,
    pub commits: Vec<CommitRecord>,
    pub pulls: Vec<PullRecord>,
    pub branches: Vec<BranchRecord>,
    pub contributors: Vec<ContributorRecord>,
}
