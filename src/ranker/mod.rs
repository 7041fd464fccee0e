//! File significance ranker.
//!
//! Given up to a few hundred candidate tree entries, selects the at-most
//! 20 most architecturally informative files to spend the content-fetch
//! budget on. Scoring is additive over independent signal categories
//! evaluated against the lowercased path, the bare filename, and path
//! depth. The ranker is a pure function: no I/O, no randomness, no
//! dependence on fetch order.

use crate::constants::{MAX_RANKED_FILES, OVERSIZE_PENALTY_BYTES};
use crate::models::TreeEntry;

// Signal weights. Exact values are heuristic; what matters is the
// relative ordering: entry-point > config > routing > domain/service >
// middleware > utility > UI, with vendor/lock/build-output dominated by
// a penalty no positive combination can recover from.
const W_ENTRY_POINT: i64 = 50;
const W_CONFIG: i64 = 40;
const W_ROUTING: i64 = 30;
const W_DOMAIN: i64 = 28;
const W_SERVICE: i64 = 26;
const W_MIDDLEWARE: i64 = 18;
const W_UTILITY: i64 = 14;
const W_UI: i64 = 12;
const W_ROOT_LEVEL: i64 = 25;
const W_SECOND_LEVEL: i64 = 10;
const W_SRC_PREFIX: i64 = 15;
const W_README: i64 = 35;
const W_LANG_ENTRY: i64 = 20;
const P_TEST: i64 = -30;
const P_VENDOR: i64 = -1000;
const P_OVERSIZE: i64 = -15;

/// Extensions eligible for ranking. Everything else is excluded
/// regardless of score.
const INTERESTING_EXTENSIONS: &[&str] = &[
    "rs", "go", "py", "js", "jsx", "ts", "tsx", "java", "kt", "kts", "rb", "php", "cs", "c",
    "cpp", "cc", "h", "hpp", "swift", "scala", "ex", "exs", "vue", "svelte", "toml", "yaml",
    "yml", "json", "md", "gradle", "sql", "proto", "sh",
];

/// Extensionless filenames that are still eligible.
const INTERESTING_FILENAMES: &[&str] = &["dockerfile", "makefile", "justfile", "gemfile", "procfile", "rakefile"];

/// Build/config manifest filenames (large positive).
const CONFIG_FILENAMES: &[&str] = &[
    "package.json", "cargo.toml", "pyproject.toml", "setup.py", "go.mod", "pom.xml",
    "build.gradle", "build.gradle.kts", "composer.json", "gemfile", "dockerfile",
    "docker-compose.yml", "docker-compose.yaml", "makefile", "tsconfig.json",
];

/// Dependency lock files (heaviest penalty, like vendor directories).
const LOCK_FILENAMES: &[&str] = &[
    "package-lock.json", "yarn.lock", "pnpm-lock.yaml", "cargo.lock", "poetry.lock",
    "gemfile.lock", "composer.lock", "go.sum",
];

/// Conventional per-ecosystem entry-point filenames (layered bonus).
const LANG_ENTRY_FILENAMES: &[&str] = &[
    "main.rs", "lib.rs", "main.go", "main.py", "__main__.py", "manage.py", "app.py",
    "application.py", "index.js", "index.ts", "main.c", "main.cpp", "main.java",
    "program.cs", "main.kt", "main.swift", "index.php",
];

/// Generated/vendored directory fragments (heaviest penalty).
const VENDOR_DIRS: &[&str] = &[
    "node_modules/", "vendor/", "dist/", "build/", "target/", "out/", ".git/", "coverage/",
    ".next/", "__pycache__/", ".venv/", "bower_components/",
];

/// Canonical source-directory prefixes.
const SRC_PREFIXES: &[&str] = &["src/", "app/", "lib/", "cmd/", "pkg/", "internal/", "source/"];

/// Rank candidate files and return the top entries, most significant
/// first. Output length is at most [`MAX_RANKED_FILES`]; entries whose
/// extension is not allow-listed, or whose score is not positive, never
/// appear.
pub fn rank(candidates: &[TreeEntry]) -> Vec<TreeEntry> {
    let mut scored: Vec<(i64, &TreeEntry)> = candidates
        .iter()
        .filter(|e| is_interesting(e))
        .map(|e| (score(e), e))
        .filter(|(s, _)| *s > 0)
        .collect();

    scored.sort_by(|(sa, ea), (sb, eb)| {
        sb.cmp(sa)
            .then(ea.depth().cmp(&eb.depth()))
            .then(ea.path.cmp(&eb.path))
    });

    scored
        .into_iter()
        .take(MAX_RANKED_FILES)
        .map(|(_, e)| e.clone())
        .collect()
}

/// Whether a file is eligible for ranking at all.
///
/// Known filenames are checked before the extension gate: `.env` and
/// `.env.example` would otherwise be rejected because their "extension"
/// is env/example.
pub fn is_interesting(entry: &TreeEntry) -> bool {
    let name = entry.file_name().to_lowercase();
    if INTERESTING_FILENAMES.contains(&name.as_str()) || name.starts_with(".env") {
        return true;
    }
    match entry.extension() {
        Some(ext) => INTERESTING_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// Additive significance score for one entry.
pub fn score(entry: &TreeEntry) -> i64 {
    let path = entry.path.to_lowercase();
    let name = entry.file_name().to_lowercase();
    let depth = entry.depth();
    let mut score = 0i64;

    // Entry-point / bootstrap filenames (highest single signal).
    if name.starts_with("main.")
        || name.starts_with("index.")
        || name.starts_with("app.")
        || name.starts_with("server.")
        || name.contains("bootstrap")
    {
        score += W_ENTRY_POINT;
    }

    // Configuration / build manifests.
    if CONFIG_FILENAMES.contains(&name.as_str())
        || path.contains("config")
        || path.contains("settings")
        || name.starts_with(".env")
    {
        score += W_CONFIG;
    }

    // Routing / API surface.
    if contains_any(&path, &["route", "controller", "handler", "endpoint", "api"]) {
        score += W_ROUTING;
    }

    // Domain / persistence.
    if contains_any(
        &path,
        &["model", "schema", "entity", "entities", "domain", "migration", "repositor", "database"],
    ) {
        score += W_DOMAIN;
    }

    // Services / business logic.
    if contains_any(&path, &["service", "usecase", "use_case", "business", "core", "worker"]) {
        score += W_SERVICE;
    }

    // Middleware / security.
    if contains_any(&path, &["middleware", "auth", "security", "guard", "session"]) {
        score += W_MIDDLEWARE;
    }

    // Utilities / shared code.
    if contains_any(&path, &["util", "helper", "shared", "common", "hook"]) {
        score += W_UTILITY;
    }

    // UI components.
    let ext = entry.extension().unwrap_or_default();
    if matches!(ext.as_str(), "jsx" | "tsx" | "vue" | "svelte")
        || contains_any(&path, &["component", "widget"])
    {
        score += W_UI;
    }

    // Shallow files describe the project more than deep ones.
    match depth {
        1 => score += W_ROOT_LEVEL,
        2 => score += W_SECOND_LEVEL,
        _ => {}
    }

    if SRC_PREFIXES.iter().any(|p| path.starts_with(p)) {
        score += W_SRC_PREFIX;
    }

    if name.starts_with("readme") {
        score += W_README;
    }

    if LANG_ENTRY_FILENAMES.contains(&name.as_str()) {
        score += W_LANG_ENTRY;
    }

    // Negative signals.
    if contains_any(&path, &["test", "spec", "fixture", "mock"]) {
        score += P_TEST;
    }

    if VENDOR_DIRS.iter().any(|d| path.contains(d))
        || LOCK_FILENAMES.contains(&name.as_str())
        || name.contains(".min.")
    {
        score += P_VENDOR;
    }

    if entry.size > OVERSIZE_PENALTY_BYTES {
        score += P_OVERSIZE;
    }

    score
}

fn contains_any(haystack: &str, fragments: &[&str]) -> bool {
    fragments.iter().any(|f| haystack.contains(f))
}
