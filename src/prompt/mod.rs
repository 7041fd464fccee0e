//! Prompt assembler: renders collected evidence into one text payload.
//!
//! Pure templating — each evidence section is substituted into a named
//! placeholder inside a fixed instructional template. The substitution is
//! a single non-recursive pass over the template: placeholder syntax
//! inside evidence values is inert.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{
    CommitRecord, ContributorRecord, EvidenceBundle, PullRecord, RepoMetadata, RepositoryFile,
    TreeEntry,
};

/// Placeholder syntax: `{{section_name}}`.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([a-z_]+)\}\}").unwrap());

/// The fixed instructional template. Specifies the two-part output
/// contract (structured block first, narrative second) and the scoring
/// rubric; the assembler fills the evidence slots.
const TEMPLATE: &str = r#"You are a senior software engineering consultant performing a structured quality assessment of a source-code repository based on the evidence below.

Respond in EXACTLY two parts, in this order:

PART 1 — a fenced code block tagged `json` containing one JSON object with:
- "scores": numeric 0-100 values for the keys "quality", "security", "reliability", "techStackFit", "teamBalance", "commitQuality", "prQuality", "structureQuality"
- "commitSummaries": an object mapping each recent commit sha to a one-sentence prose summary of what it did and how well it was executed
- "pullSummaries": an object mapping each pull request number to a one-sentence prose summary

PART 2 — a Markdown report with exactly these section headings:
## Overview
## Architecture & Structure
## Code Quality
## Security
## Team & Process
## Recommendations

Scoring rubric: 90-100 exemplary, 70-89 solid with minor issues, 50-69 workable but with notable gaps, 30-49 significant problems, 0-29 severely deficient. Judge only from the evidence given; do not invent facts.

# Repository facts
{{repo_facts}}

# Language breakdown (bytes)
{{languages}}

# README excerpt
{{readme}}

# File tree (first entries)
{{file_tree}}

# Selected file contents
{{files}}

# Recent commits
{{commits}}

# Pull requests
{{pulls}}

# Contributors
{{contributors}}
"#;

/// Render the full prompt for a review request.
///
/// Every placeholder in the template is substituted exactly once; a
/// single pass scans the template only, so evidence text can never be
/// treated as a nested placeholder.
pub fn assemble(bundle: &EvidenceBundle) -> String {
    let sections: HashMap<&str, String> = HashMap::from([
        ("repo_facts", render_facts(&bundle.metadata)),
        ("languages", render_languages(bundle)),
        (
            "readme",
            bundle
                .readme_excerpt
                .clone()
                .unwrap_or_else(|| "(no README found)".to_string()),
        ),
        ("file_tree", render_tree(&bundle.tree)),
        ("files", render_files(&bundle.ranked_files)),
        ("commits", render_commits(&bundle.commits)),
        ("pulls", render_pulls(&bundle.pulls)),
        ("contributors", render_contributors(&bundle.contributors)),
    ]);

    PLACEHOLDER_RE
        .replace_all(TEMPLATE, |caps: &regex::Captures| {
            sections.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

fn render_facts(meta: &RepoMetadata) -> String {
    let mut out = format!(
        "name: {}\nstars: {}  forks: {}  open issues: {}\n",
        meta.full_name, meta.stargazers_count, meta.forks_count, meta.open_issues_count
    );
    if let Some(ref desc) = meta.description {
        out.push_str(&format!("description: {desc}\n"));
    }
    if let Some(ref branch) = meta.default_branch {
        out.push_str(&format!("default branch: {branch}\n"));
    }
    if let (Some(created), Some(pushed)) = (&meta.created_at, &meta.pushed_at) {
        out.push_str(&format!("created: {created}  last push: {pushed}\n"));
    }
    out
}

fn render_languages(bundle: &EvidenceBundle) -> String {
    if bundle.languages.is_empty() {
        return "(no language data)".to_string();
    }
    bundle
        .languages
        .iter()
        .map(|(lang, bytes)| format!("{lang}: {bytes}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_tree(tree: &[TreeEntry]) -> String {
    if tree.is_empty() {
        return "(empty repository)".to_string();
    }
    tree.iter()
        .map(|e| format!("{} ({} bytes)", e.path, e.size))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_files(files: &[RepositoryFile]) -> String {
    if files.is_empty() {
        return "(no file contents selected)".to_string();
    }
    let mut out = String::new();
    for file in files {
        out.push_str(&format!("--- {} ---\n", file.path));
        match &file.content_excerpt {
            Some(content) => out.push_str(content),
            None => out.push_str("(content unavailable)"),
        }
        out.push_str("\n\n");
    }
    out
}

fn render_commits(commits: &[CommitRecord]) -> String {
    if commits.is_empty() {
        return "(no commits)".to_string();
    }
    let mut out = String::new();
    for commit in commits {
        out.push_str(&format!(
            "{} {} — {} ({})\n",
            &commit.sha[..commit.sha.len().min(8)],
            commit.message.lines().next().unwrap_or(""),
            commit.author_name,
            commit.author_date
        ));
        if let Some(stats) = commit.stats {
            out.push_str(&format!("  +{} -{}\n", stats.additions, stats.deletions));
        }
        if let Some(ref files) = commit.modified_files {
            for f in files {
                out.push_str(&format!("  {} [{}]\n", f.filename, f.status));
                if let Some(ref patch) = f.patch_excerpt {
                    for line in patch.lines() {
                        out.push_str(&format!("    {line}\n"));
                    }
                }
            }
        }
    }
    out
}

fn render_pulls(pulls: &[PullRecord]) -> String {
    if pulls.is_empty() {
        return "(no pull requests)".to_string();
    }
    pulls
        .iter()
        .map(|p| {
            let merged = match &p.merged_at {
                Some(at) => format!(", merged {at}"),
                None => String::new(),
            };
            format!("#{} [{}] {} — {}{}", p.number, p.state, p.title, p.author, merged)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_contributors(contributors: &[ContributorRecord]) -> String {
    if contributors.is_empty() {
        return "(no contributor data)".to_string();
    }
    contributors
        .iter()
        .map(|c| format!("{}: {} commits", c.login, c.contributions))
        .collect::<Vec<_>>()
        .join("\n")
}
