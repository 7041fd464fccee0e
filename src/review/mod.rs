//! Streaming review generator.
//!
//! Assembles the prompt from an evidence bundle, drives the configured
//! provider on a background task, and hands the caller a channel of
//! stream events. Dropping the receiver cancels the producer: the
//! provider notices the closed channel and stops reading.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::models::{EvidenceBundle, StreamEvent};
use crate::prompt;
use crate::providers::StreamingProvider;

/// Buffered events between producer and consumer. Small on purpose so a
/// slow consumer applies backpressure instead of ballooning memory.
const CHANNEL_CAPACITY: usize = 64;

/// Drives one streaming review through a provider.
pub struct ReviewGenerator {
    provider: Arc<dyn StreamingProvider>,
    model: String,
}

impl ReviewGenerator {
    pub fn new(provider: Arc<dyn StreamingProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Start the review and return the event stream.
    ///
    /// A provider failure surfaces as a single [`StreamEvent::TerminalError`],
    /// always the last event. The channel closing after that (or after a
    /// clean end of stream) is the completion signal.
    pub fn generate(&self, bundle: EvidenceBundle) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let provider = Arc::clone(&self.provider);
        let model = self.model.clone();

        tokio::spawn(async move {
            let prompt = prompt::assemble(&bundle);
            if let Err(e) = provider.stream(&prompt, &model, tx.clone()).await {
                // Best effort: if the consumer is gone there is nobody
                // left to tell.
                let _ = tx.send(StreamEvent::TerminalError(e.to_string())).await;
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::providers::ProviderError;

    struct CannedProvider {
        deltas: Vec<&'static str>,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl StreamingProvider for CannedProvider {
        async fn stream(
            &self,
            _prompt: &str,
            _model: &str,
            tx: mpsc::Sender<StreamEvent>,
        ) -> Result<(), ProviderError> {
            for (i, delta) in self.deltas.iter().enumerate() {
                if self.fail_after == Some(i) {
                    return Err(ProviderError::Api("connection reset".to_string()));
                }
                if tx
                    .send(StreamEvent::TextDelta(delta.to_string()))
                    .await
                    .is_err()
                {
                    return Ok(());
                }
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn forwards_deltas_then_closes() {
        let generator = ReviewGenerator::new(
            Arc::new(CannedProvider {
                deltas: vec!["Hello ", "world"],
                fail_after: None,
            }),
            "test-model",
        );
        let mut rx = generator.generate(EvidenceBundle::default());

        let mut text = String::new();
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::TextDelta(delta) => text.push_str(&delta),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(text, "Hello world");
    }

    #[tokio::test]
    async fn provider_failure_becomes_single_terminal_error() {
        let generator = ReviewGenerator::new(
            Arc::new(CannedProvider {
                deltas: vec!["partial", "never sent"],
                fail_after: Some(1),
            }),
            "test-model",
        );
        let mut rx = generator.generate(EvidenceBundle::default());

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::TextDelta("partial".to_string()));
        match &events[1] {
            StreamEvent::TerminalError(msg) => assert!(msg.contains("connection reset")),
            other => panic!("expected TerminalError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropping_receiver_cancels_producer() {
        let generator = ReviewGenerator::new(
            Arc::new(CannedProvider {
                deltas: vec!["a"; 500],
                fail_after: None,
            }),
            "test-model",
        );
        let rx = generator.generate(EvidenceBundle::default());
        drop(rx);
        // The spawned task sees the closed channel and exits; nothing to
        // assert beyond not hanging.
        tokio::task::yield_now().await;
    }
}
