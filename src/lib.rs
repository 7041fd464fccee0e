//! repogauge — streaming AI assessment of GitHub repositories (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod collector;
pub mod config;
pub mod constants;
pub mod demux;
pub mod env;
pub mod models;
pub mod net;
pub mod output;
pub mod prompt;
pub mod providers;
pub mod ranker;
pub mod review;
pub mod vault;
