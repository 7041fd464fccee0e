//! Clap argument types and validation.

use clap::Parser;

use repogauge::models::Backend;
use repogauge::vault::ServiceClass;

/// Streaming AI assessment of GitHub repositories.
#[derive(Parser, Debug)]
#[command(
    name = "repogauge",
    version = repogauge::constants::VERSION,
    about = "Streaming AI assessment of GitHub repositories.",
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Review a repository and stream the report to the terminal.
    Review(ReviewArgs),

    /// Manage stored API credentials.
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Print version and build information.
    Version,
}

/// Arguments for the `review` subcommand.
#[derive(Parser, Debug)]
pub struct ReviewArgs {
    /// Repository to review, as `owner/repo`.
    pub target: String,

    /// LLM backend: anthropic or ollama.
    #[arg(long)]
    pub backend: Option<Backend>,

    /// Model identifier (default: the backend's default model).
    #[arg(long)]
    pub model: Option<String>,

    /// Override the backend's API root URL.
    #[arg(long)]
    pub base_url: Option<String>,
}

impl ReviewArgs {
    /// Split the target into `(owner, repo)`, rejecting malformed input.
    /// Returns owned strings so the caller can keep using the result
    /// after consuming the other argument fields.
    pub fn parse_target(&self) -> Result<(String, String), String> {
        match self.target.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok((owner.to_string(), repo.to_string()))
            }
            _ => Err(format!(
                "invalid repository '{}': expected the form owner/repo",
                self.target
            )),
        }
    }
}

/// Credential management subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum KeysAction {
    /// List configured credentials (secrets redacted).
    List,
    /// Store a credential in the global config (~/.config/repogauge/config.toml).
    Add {
        /// Service class: repo-host (github) or llm-provider (llm).
        class: ServiceClass,
        /// The token or API key.
        secret: String,
    },
    /// Remove a stored credential from the global config.
    Remove {
        /// Service class: repo-host (github) or llm-provider (llm).
        class: ServiceClass,
        /// The token or API key to remove.
        secret: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_args(target: &str) -> ReviewArgs {
        ReviewArgs {
            target: target.to_string(),
            backend: None,
            model: None,
            base_url: None,
        }
    }

    #[test]
    fn parse_target_accepts_owner_slash_repo() {
        let args = review_args("rust-lang/cargo");
        let (owner, repo) = args.parse_target().unwrap();
        assert_eq!((owner.as_str(), repo.as_str()), ("rust-lang", "cargo"));
    }

    #[test]
    fn parse_target_result_outlives_the_args() {
        let mut args = review_args("octo/cat");
        args.model = Some("mistral".to_string());
        let (owner, repo) = args.parse_target().unwrap();
        // The parsed pair stays valid after the option fields are moved
        // out of the args struct.
        let model = args.model;
        let base_url = args.base_url;
        assert_eq!((owner.as_str(), repo.as_str()), ("octo", "cat"));
        assert_eq!(model.as_deref(), Some("mistral"));
        assert!(base_url.is_none());
    }

    #[test]
    fn parse_target_rejects_malformed() {
        assert!(review_args("cargo").parse_target().is_err());
        assert!(review_args("a/b/c").parse_target().is_err());
        assert!(review_args("/repo").parse_target().is_err());
        assert!(review_args("owner/").parse_target().is_err());
    }

    #[test]
    fn cli_parses_review_command() {
        let cli = Cli::try_parse_from([
            "repogauge",
            "review",
            "rust-lang/cargo",
            "--backend",
            "ollama",
            "--model",
            "mistral",
        ])
        .unwrap();
        match cli.command {
            Command::Review(args) => {
                assert_eq!(args.target, "rust-lang/cargo");
                assert_eq!(args.backend, Some(Backend::Ollama));
                assert_eq!(args.model.as_deref(), Some("mistral"));
            }
            other => panic!("expected review command, got {other:?}"),
        }
    }

    #[test]
    fn cli_parses_keys_add() {
        let cli =
            Cli::try_parse_from(["repogauge", "keys", "add", "github", "ghp_abc123"]).unwrap();
        match cli.command {
            Command::Keys {
                action: KeysAction::Add { class, secret },
            } => {
                assert_eq!(class, ServiceClass::RepoHost);
                assert_eq!(secret, "ghp_abc123");
            }
            other => panic!("expected keys add, got {other:?}"),
        }
    }
}
