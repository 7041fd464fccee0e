//! Local daemon backend (Ollama `/api/generate`, newline-delimited JSON).
//!
//! Unauthenticated and localhost-only, so it bypasses the credential
//! vault entirely. Each response line is one JSON object; the final
//! object carries `done: true` plus the token counters.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::constants::APP_NAME;
use crate::models::{StreamEvent, TokenUsage};

use super::{ProviderError, StreamingProvider};

/// Local NDJSON streaming provider.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(APP_NAME)
            .build()
            .expect("default TLS backend available");
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StreamingProvider for OllamaProvider {
    async fn stream(
        &self,
        prompt: &str,
        model: &str,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": model,
            "prompt": prompt,
            "stream": true,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ProviderError::Api(format!("local daemon unreachable at {}: {e}", self.base_url))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!(
                "generate request failed with {status}: {detail}"
            )));
        }

        let mut byte_stream = response.bytes_stream();
        let mut line_buf = String::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk =
                chunk.map_err(|e| ProviderError::Api(format!("stream read error: {e}")))?;
            line_buf.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = line_buf.find('\n') {
                let line = line_buf[..pos].trim().to_string();
                line_buf.drain(..=pos);
                for event in parse_generate_line(&line)? {
                    if tx.send(event).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct GenerateFrame {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
    #[serde(default)]
    error: Option<String>,
}

/// Parse one NDJSON line into zero or more stream events.
///
/// The final `done` object may carry both a trailing response fragment
/// and the usage counters, so this returns a list.
fn parse_generate_line(line: &str) -> Result<Vec<StreamEvent>, ProviderError> {
    if line.is_empty() {
        return Ok(Vec::new());
    }
    let frame: GenerateFrame = serde_json::from_str(line)
        .map_err(|e| ProviderError::Api(format!("malformed daemon response line: {e}")))?;

    if let Some(message) = frame.error {
        return Err(ProviderError::Api(message));
    }

    let mut events = Vec::new();
    if let Some(text) = frame.response {
        if !text.is_empty() {
            events.push(StreamEvent::TextDelta(text));
        }
    }
    if frame.done {
        events.push(StreamEvent::UsageDelta(TokenUsage {
            input_tokens: frame.prompt_eval_count,
            output_tokens: frame.eval_count,
        }));
    }
    Ok(events)
}
