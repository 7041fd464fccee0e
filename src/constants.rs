//! App-wide constants.
//!
//! Centralises the tool name, config paths, environment variable names,
//! API endpoints, and evidence caps so a rename or retune only requires
//! changing this file.

use std::time::Duration;

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "repogauge";

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compilation target triple (set by build.rs).
pub const TARGET: &str = env!("TARGET");

/// Directory name under `~/.config/` for the global config file.
pub const CONFIG_DIR: &str = "repogauge";

// ── External services ───────────────────────────────────────────────

/// Repository host REST API root.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Cloud LLM streaming-completion endpoint root.
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

/// API version header value required by the cloud LLM service.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Local LLM daemon root (newline-delimited JSON generate endpoint).
pub const OLLAMA_URL: &str = "http://localhost:11434";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_GITHUB_TOKENS: &str = "REPOGAUGE_GITHUB_TOKENS";
pub const ENV_LLM_KEYS: &str = "REPOGAUGE_LLM_KEYS";
pub const ENV_BACKEND: &str = "REPOGAUGE_BACKEND";
pub const ENV_MODEL: &str = "REPOGAUGE_MODEL";
pub const ENV_BASE_URL: &str = "REPOGAUGE_BASE_URL";

// ── Evidence caps ───────────────────────────────────────────────────

/// Tree entries considered for ranking (first N blobs of the recursive tree).
pub const MAX_TREE_ENTRIES: usize = 300;

/// Most-recent commits fetched.
pub const MAX_COMMITS: u32 = 30;

/// Pull requests fetched (any state).
pub const MAX_PULLS: u32 = 10;

/// Branches fetched.
pub const MAX_BRANCHES: u32 = 50;

/// Contributors fetched.
pub const MAX_CONTRIBUTORS: u32 = 50;

/// Newest commits enriched with stats and patch excerpts.
pub const ENRICHED_COMMITS: usize = 15;

/// Ranked files whose content is fetched and embedded as evidence.
pub const MAX_RANKED_FILES: usize = 20;

/// Per-file content excerpt cap in characters.
pub const FILE_EXCERPT_CHARS: usize = 8000;

/// Per-commit patch excerpt cap in characters.
pub const PATCH_EXCERPT_CHARS: usize = 1500;

/// Files above this byte size are lightly penalized by the ranker.
pub const OVERSIZE_PENALTY_BYTES: u64 = 100_000;

// ── Retry policy ────────────────────────────────────────────────────

/// How long a rate-limited credential is excluded from rotation.
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// Attempt ceiling for repository host calls.
pub const REPO_HOST_MAX_ATTEMPTS: u32 = 5;

/// Attempt ceiling for LLM provider calls.
pub const LLM_MAX_ATTEMPTS: u32 = 3;
