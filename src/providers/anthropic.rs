//! Cloud streaming-completion backend (Anthropic Messages API, SSE).
//!
//! Requests go through the request controller so the api key rotates on
//! 429/403 before the stream starts; a failed attempt never forwards
//! partial output because rotation happens before the first byte is read.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::constants::{ANTHROPIC_VERSION, LLM_MAX_ATTEMPTS};
use crate::models::{StreamEvent, TokenUsage};
use crate::net::{RequestController, RequestError};
use crate::vault::ServiceClass;

use super::{ProviderError, StreamingProvider};

/// Output budget per completion. Generous: the report plus the fenced
/// score block together stay well under this.
const MAX_TOKENS: u32 = 8192;

/// Cloud SSE streaming provider.
pub struct AnthropicProvider {
    controller: RequestController,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(controller: RequestController, base_url: impl Into<String>) -> Self {
        Self {
            controller,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StreamingProvider for AnthropicProvider {
    async fn stream(
        &self,
        prompt: &str,
        model: &str,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "stream": true,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .controller
            .execute(ServiceClass::LlmProvider, LLM_MAX_ATTEMPTS, |client| {
                client
                    .post(&url)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body)
            })
            .await
            .map_err(|e| match e {
                RequestError::NoUsableCredential(_) => ProviderError::NotConfigured(
                    "no usable LLM credential — add one or set REPOGAUGE_LLM_KEYS".to_string(),
                ),
                other => ProviderError::Api(other.to_string()),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!(
                "completion request failed with {status}: {detail}"
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
                if let Some(event) = parse_sse_line(&line)? {
                    if tx.send(event).await.is_err() {
                        // Consumer abandoned the stream.
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SseFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<SseDelta>,
    #[serde(default)]
    message: Option<SseMessage>,
    #[serde(default)]
    usage: Option<SseUsage>,
    #[serde(default)]
    error: Option<SseError>,
}

#[derive(Debug, Deserialize)]
struct SseDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseMessage {
    #[serde(default)]
    usage: Option<SseUsage>,
}

#[derive(Debug, Default, Deserialize)]
struct SseUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct SseError {
    #[serde(default)]
    message: String,
}

impl From<SseUsage> for TokenUsage {
    fn from(u: SseUsage) -> Self {
        TokenUsage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        }
    }
}

/// Parse one SSE line into a stream event.
///
/// `event:` lines and blank keep-alive lines carry no payload and are
/// skipped; unknown `data:` frame kinds are ignored for forward
/// compatibility. An `error` frame fails the stream.
fn parse_sse_line(line: &str) -> Result<Option<StreamEvent>, ProviderError> {
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let payload = payload.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return Ok(None);
    }

    let frame: SseFrame = match serde_json::from_str(payload) {
        Ok(frame) => frame,
        // Tolerate malformed keep-alive noise rather than killing the stream.
        Err(_) => return Ok(None),
    };

    match frame.kind.as_str() {
        "content_block_delta" => Ok(frame
            .delta
            .and_then(|d| d.text)
            .map(StreamEvent::TextDelta)),
        "message_start" => Ok(frame
            .message
            .and_then(|m| m.usage)
            .map(|u| StreamEvent::UsageDelta(u.into()))),
        "message_delta" => Ok(frame.usage.map(|u| StreamEvent::UsageDelta(u.into()))),
        "error" => Err(ProviderError::Api(
            frame
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "unknown provider error".to_string()),
        )),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_delta() {
        let line = r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#;
        let event = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(event, StreamEvent::TextDelta("Hello".into()));
    }

    #[test]
    fn parses_message_start_usage() {
        let line = r#"data: {"type":"message_start","message":{"usage":{"input_tokens":1042,"output_tokens":1}}}"#;
        let event = parse_sse_line(line).unwrap().unwrap();
        match event {
            StreamEvent::UsageDelta(usage) => {
                assert_eq!(usage.input_tokens, 1042);
                assert_eq!(usage.output_tokens, 1);
            }
            other => panic!("expected UsageDelta, got {other:?}"),
        }
    }

    #[test]
    fn parses_message_delta_usage() {
        let line = r#"data: {"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":512}}"#;
        let event = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(
            event,
            StreamEvent::UsageDelta(TokenUsage {
                input_tokens: 0,
                output_tokens: 512
            })
        );
    }

    #[test]
    fn skips_event_lines_and_blanks() {
        assert!(parse_sse_line("event: content_block_delta").unwrap().is_none());
        assert!(parse_sse_line("").unwrap().is_none());
        assert!(parse_sse_line("data:").unwrap().is_none());
    }

    #[test]
    fn skips_unknown_frame_kinds() {
        let line = r#"data: {"type":"content_block_start","index":0}"#;
        assert!(parse_sse_line(line).unwrap().is_none());
    }

    #[test]
    fn error_frame_fails_the_stream() {
        let line = r#"data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = parse_sse_line(line).unwrap_err();
        assert!(err.to_string().contains("Overloaded"));
    }

    #[test]
    fn malformed_data_line_is_skipped() {
        assert!(parse_sse_line("data: {not json").unwrap().is_none());
    }
}
