//! OpenAI-compatible chat-completions endpoint
//!
//! Posts to `{base_url}/chat/completions` with a bearer token. Event-stream
//! bodies are split into chunks; any other body is kept as JSON when it parses
//! and as opaque text when it does not. Shape interpretation is left to the
//! normalizer.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::{ChatEndpoint, ChatRequest, LlmError, ModelReply, ReplyChunk};
use crate::config::ResolvedLlmConfig;

/// HTTP transport for an OpenAI-compatible serving endpoint
#[derive(Debug, Clone)]
pub struct HttpChatEndpoint {
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl HttpChatEndpoint {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, ?timeout, "HttpChatEndpoint::new: called");
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;
        Ok(Self {
            base_url,
            http,
            timeout,
        })
    }

    /// Create an endpoint from resolved configuration
    pub fn from_config(config: &ResolvedLlmConfig) -> Result<Self, LlmError> {
        debug!(?config, "HttpChatEndpoint::from_config: called");
        Self::new(config.base_url.clone(), Duration::from_millis(config.timeout_ms))
    }

    pub fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn transport_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.timeout)
        } else {
            LlmError::Network(err)
        }
    }

    /// Collect an event-stream body into chunks, in arrival order
    async fn read_event_stream(&self, response: reqwest::Response) -> Result<ModelReply, LlmError> {
        debug!("read_event_stream: called");
        let mut stream = response.bytes_stream();
        let mut lines = SseLineBuffer::default();
        let mut chunks = Vec::new();

        while let Some(bytes) = stream.next().await {
            let bytes = bytes.map_err(|e| self.transport_error(e))?;
            chunks.extend(lines.push(&bytes));
        }
        chunks.extend(lines.finish());

        debug!(chunk_count = chunks.len(), "read_event_stream: done");
        Ok(ModelReply::Chunks(chunks))
    }
}

/// Splits an event-stream body into lines across network reads
///
/// Bytes are held until a full line has arrived, so a multibyte character
/// split between two reads is decoded whole.
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Append one read and return the chunks of every line it completed
    fn push(&mut self, bytes: &[u8]) -> Vec<ReplyChunk> {
        self.pending.extend_from_slice(bytes);
        let mut chunks = Vec::new();
        while let Some(line_end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=line_end).collect();
            chunks.extend(decode_sse_line(&line));
        }
        chunks
    }

    /// Flush a final line that had no trailing newline
    fn finish(self) -> Option<ReplyChunk> {
        decode_sse_line(&self.pending)
    }
}

fn decode_sse_line(line: &[u8]) -> Option<ReplyChunk> {
    match std::str::from_utf8(line) {
        Ok(text) => parse_sse_line(text),
        Err(e) => {
            debug!(%e, len = line.len(), "decode_sse_line: invalid UTF-8");
            let text = String::from_utf8_lossy(line);
            let data = text.trim().strip_prefix("data:")?.trim();
            Some(ReplyChunk::Raw(data.to_string()))
        }
    }
}

/// Turn one event-stream line into a chunk
///
/// Only `data:` lines carry chunks; the `[DONE]` sentinel is dropped.
pub fn parse_sse_line(line: &str) -> Option<ReplyChunk> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(match serde_json::from_str(data) {
        Ok(value) => ReplyChunk::Record(value),
        Err(_) => ReplyChunk::Raw(data.to_string()),
    })
}

#[async_trait]
impl ChatEndpoint for HttpChatEndpoint {
    async fn send(&self, request: &ChatRequest, token: &str) -> Result<ModelReply, LlmError> {
        debug!(model = %request.model, stream = request.stream, "HttpChatEndpoint::send: called");
        let response = self
            .http
            .post(self.url())
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "HttpChatEndpoint::send: API error");
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));
        if is_event_stream {
            debug!("HttpChatEndpoint::send: event stream reply");
            return self.read_event_stream(response).await;
        }

        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        match serde_json::from_str(&text) {
            Ok(value) => {
                debug!("HttpChatEndpoint::send: JSON reply");
                Ok(ModelReply::Body(value))
            }
            Err(_) => {
                debug!(len = text.len(), "HttpChatEndpoint::send: non-JSON reply");
                Ok(ModelReply::Opaque(text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_joins_without_double_slash() {
        let endpoint = HttpChatEndpoint::new("https://adb.example.net/serving-endpoints/", Duration::from_secs(5)).unwrap();
        assert_eq!(endpoint.url(), "https://adb.example.net/serving-endpoints/chat/completions");
    }

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(
            parse_sse_line("data: {\"choices\":[]}\n"),
            Some(ReplyChunk::Record(json!({ "choices": [] })))
        );
        assert_eq!(parse_sse_line("data:[DONE]"), None);
        assert_eq!(parse_sse_line("data: [DONE]\r\n"), None);
        assert_eq!(parse_sse_line(": keep-alive"), None);
        assert_eq!(parse_sse_line("event: message"), None);
        assert_eq!(parse_sse_line(""), None);
        assert_eq!(parse_sse_line("data: partial {"), Some(ReplyChunk::Raw("partial {".to_string())));
    }

    fn delta_content(chunk: &ReplyChunk) -> &str {
        match chunk {
            ReplyChunk::Record(record) => record.pointer("/choices/0/delta/content").and_then(|v| v.as_str()).unwrap(),
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_line_buffer_keeps_split_multibyte_char() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"# café pipeline\"}}]}\n\ndata: [DONE]\n\n";
        let bytes = body.as_bytes();
        // Split inside the two-byte 'é'
        let split = body.find('é').unwrap() + 1;

        let mut lines = SseLineBuffer::default();
        let mut chunks = lines.push(&bytes[..split]);
        assert!(chunks.is_empty());
        chunks.extend(lines.push(&bytes[split..]));
        chunks.extend(lines.finish());

        assert_eq!(chunks.len(), 1);
        assert_eq!(delta_content(&chunks[0]), "# café pipeline");
    }

    #[test]
    fn test_line_buffer_byte_at_a_time() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"naïve \"}}]}\r\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"数据\"}}]}";
        let mut lines = SseLineBuffer::default();
        let mut chunks = Vec::new();
        for byte in body.as_bytes() {
            chunks.extend(lines.push(std::slice::from_ref(byte)));
        }
        chunks.extend(lines.finish());

        let text: String = chunks.iter().map(delta_content).collect();
        assert_eq!(text, "naïve 数据");
    }

    #[test]
    fn test_line_buffer_invalid_utf8_becomes_raw() {
        let mut lines = SseLineBuffer::default();
        let chunks = lines.push(b"data: {\"x\": \"\xff\"}\n: comment \xfe\n");
        assert_eq!(chunks.len(), 1);
        assert!(matches!(&chunks[0], ReplyChunk::Raw(raw) if raw.starts_with("{\"x\"")));
        assert!(lines.finish().is_none());
    }
}
