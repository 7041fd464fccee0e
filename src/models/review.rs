//! Stream events and the structured review block.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One event from the streaming review generator.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental narrative/report text, delivered in receipt order.
    TextDelta(String),
    /// Token-usage counters. May interleave at arbitrary points and may
    /// arrive more than once.
    UsageDelta(TokenUsage),
    /// Unrecoverable failure; always the last event when present.
    TerminalError(String),
}

/// Token-usage counters reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Merge a later usage report into this one. Counters are cumulative
    /// per attempt, so later non-zero values replace earlier ones.
    pub fn merge(&mut self, other: TokenUsage) {
        if other.input_tokens > 0 {
            self.input_tokens = other.input_tokens;
        }
        if other.output_tokens > 0 {
            self.output_tokens = other.output_tokens;
        }
    }
}

/// The 0–100 score axes the LLM is instructed to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewScores {
    pub quality: f64,
    pub security: f64,
    pub reliability: f64,
    pub tech_stack_fit: f64,
    pub team_balance: f64,
    pub commit_quality: f64,
    pub pr_quality: f64,
    pub structure_quality: f64,
}

impl ReviewScores {
    /// (label, value) pairs in display order.
    pub fn entries(&self) -> [(&'static str, f64); 8] {
        [
            ("Quality", self.quality),
            ("Security", self.security),
            ("Reliability", self.reliability),
            ("Tech stack fit", self.tech_stack_fit),
            ("Team balance", self.team_balance),
            ("Commit quality", self.commit_quality),
            ("PR quality", self.pr_quality),
            ("Structure", self.structure_quality),
        ]
    }
}

/// The structured block demultiplexed out of the token stream.
///
/// `scores` and `commit_summaries` are the two mandatory keys; a fenced
/// JSON object lacking either is not treated as the review block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewBlock {
    pub scores: ReviewScores,
    /// Commit sha → prose summary.
    pub commit_summaries: IndexMap<String, String>,
    /// PR number → prose summary.
    pub pull_summaries: IndexMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_parse_camel_case() {
        let json = r#"{
            "quality": 72,
            "security": 55.5,
            "techStackFit": 80,
            "commitQuality": 61
        }"#;
        let scores: ReviewScores = serde_json::from_str(json).unwrap();
        assert_eq!(scores.quality, 72.0);
        assert_eq!(scores.security, 55.5);
        assert_eq!(scores.tech_stack_fit, 80.0);
        assert_eq!(scores.commit_quality, 61.0);
        // Unspecified axes default to zero rather than failing the parse.
        assert_eq!(scores.reliability, 0.0);
    }

    #[test]
    fn block_parses_with_summaries() {
        let json = r#"{
            "scores": {"quality": 50},
            "commitSummaries": {"abc123": "Fixed the build."},
            "pullSummaries": {"7": "Adds CI."}
        }"#;
        let block: ReviewBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.commit_summaries["abc123"], "Fixed the build.");
        assert_eq!(block.pull_summaries["7"], "Adds CI.");
    }

    #[test]
    fn usage_merge_keeps_latest_nonzero() {
        let mut usage = TokenUsage {
            input_tokens: 1200,
            output_tokens: 0,
        };
        usage.merge(TokenUsage {
            input_tokens: 0,
            output_tokens: 340,
        });
        assert_eq!(usage.input_tokens, 1200);
        assert_eq!(usage.output_tokens, 340);
        assert_eq!(usage.total(), 1540);
    }
}
