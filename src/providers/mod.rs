//! StreamingProvider trait and LLM backends.
//!
//! Provides an abstraction layer over the concrete LLM services so the
//! review generator is decoupled from any one wire format. Both backends
//! push events into the caller's channel as they arrive — a provider
//! never buffers the whole response before the first event.

pub mod anthropic;
pub mod ollama;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::StreamEvent;

/// Errors from a streaming provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("LLM API error: {0}")]
    Api(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Trait for LLM backends that stream a completion.
///
/// Implementations send [`StreamEvent::TextDelta`] and
/// [`StreamEvent::UsageDelta`] into `tx` in receipt order and return when
/// the stream ends. A closed channel (consumer dropped the receiver)
/// means early exit: the implementation must stop reading and return
/// `Ok(())`, dropping the underlying connection.
#[async_trait]
pub trait StreamingProvider: Send + Sync {
    async fn stream(
        &self,
        prompt: &str,
        model: &str,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError>;
}
