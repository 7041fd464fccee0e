//! Terminal rendering of the structured review block.
//!
//! The narrative part of a review streams straight to stdout as it
//! arrives; this module renders what comes after — the score panel, the
//! per-commit and per-PR summaries, and the dimmed usage footer.

use colored::Colorize;

use crate::models::{ReviewBlock, TokenUsage};

/// Render the score panel and summaries from the demultiplexed block.
pub fn render_block(block: &ReviewBlock) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n{}\n {}\n",
        "───────────────────────────────────".dimmed(),
        "Scores".bold()
    ));
    for (label, value) in block.scores.entries() {
        output.push_str(&format!(
            "   {:<16} {}\n",
            label,
            format_score(value)
        ));
    }

    if !block.commit_summaries.is_empty() {
        output.push_str(&format!("\n {}\n", "Commit summaries".bold()));
        for (sha, summary) in &block.commit_summaries {
            // Keys come straight from the model's JSON and are not
            // guaranteed to be hex, so truncate by characters.
            let short: String = sha.chars().take(8).collect();
            output.push_str(&format!("   {} {}\n", short.yellow(), summary));
        }
    }

    if !block.pull_summaries.is_empty() {
        output.push_str(&format!("\n {}\n", "Pull request summaries".bold()));
        for (number, summary) in &block.pull_summaries {
            output.push_str(&format!("   {} {}\n", format!("#{number}").cyan(), summary));
        }
    }

    output
}

/// Render the dimmed token-usage footer.
pub fn render_usage(usage: &TokenUsage) -> String {
    format!(
        "{}\n",
        format!(
            " {} tokens ({} in, {} out)",
            usage.total(),
            usage.input_tokens,
            usage.output_tokens
        )
        .dimmed()
    )
}

/// Color a 0–100 score by band: red below 40, yellow to 70, green above.
fn format_score(value: f64) -> String {
    let text = format!("{value:>5.1}");
    if value < 40.0 {
        text.red().bold().to_string()
    } else if value < 70.0 {
        text.yellow().bold().to_string()
    } else {
        text.green().bold().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewScores;

    fn sample_block() -> ReviewBlock {
        let mut block = ReviewBlock {
            scores: ReviewScores {
                quality: 72.0,
                security: 35.5,
                ..Default::default()
            },
            ..Default::default()
        };
        block
            .commit_summaries
            .insert("deadbeefcafe".to_string(), "Fixed the build.".to_string());
        block
            .pull_summaries
            .insert("7".to_string(), "Adds CI.".to_string());
        block
    }

    #[test]
    fn render_block_lists_all_axes() {
        let output = render_block(&sample_block());
        assert!(output.contains("Quality"));
        assert!(output.contains("Security"));
        assert!(output.contains("Structure"));
        assert!(output.contains("72.0"));
        assert!(output.contains("35.5"));
    }

    #[test]
    fn render_block_shortens_commit_shas() {
        let output = render_block(&sample_block());
        assert!(output.contains("deadbeef"));
        assert!(!output.contains("deadbeefcafe"));
        assert!(output.contains("Fixed the build."));
        assert!(output.contains("#7"));
    }

    #[test]
    fn render_block_tolerates_non_hex_commit_keys() {
        // The model is free to emit any string as a summary key,
        // including multi-byte text around the truncation point.
        let mut block = ReviewBlock::default();
        block
            .commit_summaries
            .insert("abcdefgкxyz".to_string(), "Odd key.".to_string());
        let output = render_block(&block);
        assert!(output.contains("abcdefgк"));
        assert!(output.contains("Odd key."));
    }

    #[test]
    fn render_block_omits_empty_summary_sections() {
        let block = ReviewBlock::default();
        let output = render_block(&block);
        assert!(!output.contains("Commit summaries"));
        assert!(!output.contains("Pull request summaries"));
    }

    #[test]
    fn render_usage_totals() {
        let usage = TokenUsage {
            input_tokens: 1200,
            output_tokens: 340,
        };
        let output = render_usage(&usage);
        assert!(output.contains("1540 tokens"));
        assert!(output.contains("1200 in"));
        assert!(output.contains("340 out"));
    }
}
