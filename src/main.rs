//! repogauge — streaming AI assessment of GitHub repositories.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use repogauge::collector;
use repogauge::config;
use repogauge::constants;
use repogauge::demux;
use repogauge::env;
use repogauge::models;
use repogauge::net;
use repogauge::output;
use repogauge::providers;
use repogauge::review;
use repogauge::vault;

use std::io::Write;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;

use cli::args::{Cli, Command, KeysAction, ReviewArgs};
use collector::GithubClient;
use config::Config;
use demux::StreamDemux;
use env::Env;
use models::{Backend, StreamEvent, TokenUsage};
use net::RequestController;
use providers::StreamingProvider;
use providers::anthropic::AnthropicProvider;
use providers::ollama::OllamaProvider;
use review::ReviewGenerator;
use vault::{CredentialVault, ServiceClass};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Review(args) => run_review(args).await,
        Command::Keys { action } => run_keys(action),
        Command::Version => run_version(),
    }
}

/// Print detailed version and build information.
fn run_version() -> Result<()> {
    use colored::Colorize;

    println!(
        "{} {}",
        "repogauge".bold(),
        constants::VERSION.green().bold()
    );
    println!("{}     {}", "target:".dimmed(), constants::TARGET);
    Ok(())
}

/// Build the startup vault from config and environment.
fn build_vault(config: &Config, env: &Env) -> Arc<CredentialVault> {
    let vault = CredentialVault::from_env(env);
    for (i, token) in config.credentials.github_tokens.iter().enumerate() {
        vault.add(
            format!("github-cfg-{}", i + 1),
            ServiceClass::RepoHost,
            token.clone(),
        );
    }
    for (i, key) in config.credentials.llm_keys.iter().enumerate() {
        vault.add(
            format!("llm-cfg-{}", i + 1),
            ServiceClass::LlmProvider,
            key.clone(),
        );
    }
    Arc::new(vault)
}

/// Manage stored credentials in the global config.
fn run_keys(action: KeysAction) -> Result<()> {
    use colored::Colorize;

    match action {
        KeysAction::List => {
            let env = Env::real();
            let config = Config::load(&env).context("failed to load configuration")?;
            let vault = build_vault(&config, &env);
            let credentials = vault.list();

            if credentials.is_empty() {
                println!("No credentials configured.");
                println!("Use `repogauge keys add <CLASS> <SECRET>` or set environment variables.");
                return Ok(());
            }
            for cred in credentials {
                println!(
                    "  {}  {}  {}",
                    cred.display_name.bold(),
                    cred.service_class.to_string().cyan(),
                    "[REDACTED]".dimmed(),
                );
            }
        }
        KeysAction::Add { class, secret } => {
            let mut config = Config::load_global_file().context("failed to load configuration")?;
            let store = match class {
                ServiceClass::RepoHost => &mut config.credentials.github_tokens,
                ServiceClass::LlmProvider => &mut config.credentials.llm_keys,
            };
            if store.contains(&secret) {
                println!("  Credential already stored.");
                return Ok(());
            }
            store.push(secret);
            config.save_global().context("failed to save configuration")?;
            println!("  {} {class} credential stored.", "✔".green().bold());
        }
        KeysAction::Remove { class, secret } => {
            let mut config = Config::load_global_file().context("failed to load configuration")?;
            let store = match class {
                ServiceClass::RepoHost => &mut config.credentials.github_tokens,
                ServiceClass::LlmProvider => &mut config.credentials.llm_keys,
            };
            let before = store.len();
            store.retain(|s| s != &secret);
            if store.len() == before {
                bail!("no stored {class} credential matches");
            }
            config.save_global().context("failed to save configuration")?;
            println!("  {} {class} credential removed.", "✔".green().bold());
        }
    }

    Ok(())
}

/// Collect evidence, stream the review, and render the results.
async fn run_review(args: ReviewArgs) -> Result<()> {
    let (owner, repo) = args
        .parse_target()
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let env = Env::real();
    let mut config = Config::load(&env).context("failed to load configuration")?;

    // CLI flags take priority over config and environment.
    if let Some(backend) = args.backend {
        config.provider.backend = backend;
    }
    if let Some(model) = args.model {
        config.provider.model = Some(model);
    }
    if let Some(base_url) = args.base_url {
        config.provider.base_url = Some(base_url);
    }

    let vault = build_vault(&config, &env);
    let controller = RequestController::new(Arc::clone(&vault));

    eprintln!("Collecting evidence for {owner}/{repo}...");
    let host = GithubClient::new(controller.clone());
    let bundle = collector::collect(&host, &owner, &repo)
        .await
        .context("evidence collection failed")?;

    let model = config.provider.resolved_model();
    let provider: Arc<dyn StreamingProvider> = match config.provider.backend {
        Backend::Anthropic => Arc::new(AnthropicProvider::new(
            controller,
            config
                .provider
                .base_url
                .clone()
                .unwrap_or_else(|| constants::ANTHROPIC_API_URL.to_string()),
        )),
        Backend::Ollama => Arc::new(OllamaProvider::new(
            config
                .provider
                .base_url
                .clone()
                .unwrap_or_else(|| constants::OLLAMA_URL.to_string()),
        )),
    };

    let generator = ReviewGenerator::new(provider, model);
    let mut rx = generator.generate(bundle);

    let mut demux = StreamDemux::new();
    let mut block = None;
    let mut usage = TokenUsage::default();
    let mut stdout = std::io::stdout();

    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::TextDelta(delta) => {
                let out = demux.push(&delta);
                print!("{}", out.narrative);
                stdout.flush().ok();
                if out.block.is_some() {
                    block = out.block;
                }
            }
            StreamEvent::UsageDelta(delta) => usage.merge(delta),
            StreamEvent::TerminalError(message) => {
                // Flush whatever narrative was withheld before failing.
                print!("{}", demux.finish().narrative);
                stdout.flush().ok();
                bail!("review failed: {message}");
            }
        }
    }

    print!("{}", demux.finish().narrative);
    stdout.flush().ok();

    match block {
        Some(ref block) => print!("{}", output::render_block(block)),
        None => eprintln!("Warning: the model produced no structured score block"),
    }
    if usage.total() > 0 {
        print!("{}", output::render_usage(&usage));
    }
    stdout.flush().ok();

    Ok(())
}
