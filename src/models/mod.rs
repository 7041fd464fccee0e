//! Shared types used across all modules.
//!
//! This module defines the core data structures for repository evidence,
//! stream events, and the structured review block. Other modules import
//! from here rather than reaching into each other's internals.

pub mod repo;
pub mod review;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use repo::{
    BranchRecord, CommitRecord, CommitStats, ContributorRecord, EvidenceBundle, ModifiedFile,
    PullRecord, RepoMetadata, RepositoryFile, TreeEntry,
};
pub use review::{ReviewBlock, ReviewScores, StreamEvent, TokenUsage};

/// Default model for the cloud backend.
pub const DEFAULT_CLOUD_MODEL: &str = "claude-sonnet-4-20250514";

/// Default model for the local daemon backend.
pub const DEFAULT_LOCAL_MODEL: &str = "llama3.1";

/// Supported LLM streaming backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Cloud streaming-completion service (keyed, SSE).
    #[default]
    Anthropic,
    /// Local HTTP daemon (unauthenticated, newline-delimited JSON).
    Ollama,
}

impl Backend {
    /// Default model identifier for this backend.
    pub fn default_model(self) -> &'static str {
        match self {
            Backend::Anthropic => DEFAULT_CLOUD_MODEL,
            Backend::Ollama => DEFAULT_LOCAL_MODEL,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Anthropic => write!(f, "anthropic"),
            Backend::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(Backend::Anthropic),
            "ollama" => Ok(Backend::Ollama),
            other => Err(format!(
                "unsupported backend: '{other}'. Supported: anthropic, ollama"
            )),
        }
    }
}
