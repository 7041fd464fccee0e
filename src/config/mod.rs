//! Configuration loading and layering.
//!
//! Handles the global `config.toml`, environment variable resolution,
//! and CLI flag merging with proper priority ordering.

pub mod loader;

pub use loader::{Config, CredentialsConfig, ProviderConfig};
