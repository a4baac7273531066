//! Response normalization
//!
//! Providers and client versions return differently shaped replies for the
//! same chat completion. The reply is classified once into a
//! [`ResponseShape`], then an ordered list of extraction strategies is tried
//! until one yields non-empty text. If every strategy misses, normalization
//! fails; it never hands back an opaque handle's string form.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{LlmError, ModelReply, ReplyChunk};

/// Prefixes of the textual form of a stream object that was never consumed
pub const UNRESOLVED_STREAM_MARKERS: [&str; 6] = [
    "<openai.Stream object",
    "<openai.AsyncStream object",
    "<Stream object",
    "<generator object",
    "<async_generator object",
    "<coroutine object",
];

/// Structural category of a model reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseShape {
    /// `choices[0].message.content`
    Standard,
    /// `choices[0].text`
    TextOnly,
    /// A sequence of incremental chunks
    Streaming,
    /// A bare text body
    PlainText,
    /// The textual form of a stream object rather than content
    UnresolvedHandle,
    /// Structured, but none of the above
    Unrecognized,
}

impl ResponseShape {
    /// Classify a reply
    pub fn detect(reply: &ModelReply) -> Self {
        let shape = match reply {
            ModelReply::Chunks(_) => Self::Streaming,
            ModelReply::Opaque(text) => Self::of_text(text),
            ModelReply::Body(Value::Array(_)) => Self::Streaming,
            ModelReply::Body(Value::String(text)) => Self::of_text(text),
            ModelReply::Body(body) => match first_choice(body) {
                Some(choice) if choice.get("message").is_some_and(Value::is_object) => Self::Standard,
                Some(choice) if choice.get("text").is_some() => Self::TextOnly,
                _ => Self::Unrecognized,
            },
        };
        debug!(?shape, "ResponseShape::detect: classified");
        shape
    }

    fn of_text(text: &str) -> Self {
        if is_unresolved_handle(text) {
            Self::UnresolvedHandle
        } else {
            Self::PlainText
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::TextOnly => "text-only",
            Self::Streaming => "streaming",
            Self::PlainText => "plain-text",
            Self::UnresolvedHandle => "unresolved-handle",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl std::fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of one extraction strategy; `Err` carries why it missed
type Attempt = Result<String, &'static str>;

type Strategy = fn(&ModelReply) -> Attempt;

/// Extraction strategies, in priority order
const STRATEGIES: [(&str, Strategy); 4] = [
    ("message", extract_message),
    ("text", extract_text),
    ("stream", extract_stream),
    ("stringify", extract_stringified),
];

/// Extract plain text from a reply, trying each strategy in order
pub fn normalize(reply: &ModelReply) -> Result<String, LlmError> {
    let shape = ResponseShape::detect(reply);
    debug!(%shape, "normalize: called");

    for (name, strategy) in STRATEGIES {
        match strategy(reply) {
            Ok(text) => {
                debug!(strategy = name, len = text.len(), "normalize: extracted");
                return Ok(text);
            }
            Err(reason) => debug!(strategy = name, reason, "normalize: strategy missed"),
        }
    }

    warn!(%shape, "normalize: no usable text in model reply");
    Err(LlmError::Extraction { shape })
}

/// True when `text` looks like the textual form of an unconsumed stream
pub fn is_unresolved_handle(text: &str) -> bool {
    let text = text.trim_start();
    UNRESOLVED_STREAM_MARKERS.iter().any(|marker| text.starts_with(marker))
}

fn first_choice(body: &Value) -> Option<&Value> {
    body.get("choices")?.as_array()?.first()
}

fn non_empty(text: String, reason: &'static str) -> Attempt {
    if text.trim().is_empty() { Err(reason) } else { Ok(text) }
}

/// Strategy 1: `choices[0].message.content`
///
/// Content given as an array of parts has its text parts joined in order.
fn extract_message(reply: &ModelReply) -> Attempt {
    let ModelReply::Body(body) = reply else {
        return Err("not a buffered body");
    };
    let content = first_choice(body)
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .ok_or("no message content")?;

    match content {
        Value::String(text) => non_empty(text.clone(), "message content is empty"),
        Value::Array(parts) => {
            let joined: String = parts
                .iter()
                .filter_map(|part| match part {
                    Value::String(text) => Some(text.as_str()),
                    other => other.get("text").and_then(Value::as_str),
                })
                .collect();
            non_empty(joined, "message content parts carry no text")
        }
        _ => Err("message content is not text"),
    }
}

/// Strategy 2: `choices[0].text`
fn extract_text(reply: &ModelReply) -> Attempt {
    let ModelReply::Body(body) = reply else {
        return Err("not a buffered body");
    };
    match first_choice(body).and_then(|choice| choice.get("text")) {
        Some(Value::String(text)) => non_empty(text.clone(), "choice text is empty"),
        Some(_) => Err("choice text is not text"),
        None => Err("no choice text"),
    }
}

/// Strategy 3: concatenate fragments of a chunk sequence
fn extract_stream(reply: &ModelReply) -> Attempt {
    let mut fragments = 0usize;
    let mut skipped = 0usize;
    let mut text = String::new();

    let mut collect = |chunk: Option<String>| match chunk {
        Some(fragment) => {
            fragments += 1;
            text.push_str(&fragment);
        }
        None => skipped += 1,
    };

    match reply {
        ModelReply::Chunks(chunks) => chunks.iter().for_each(|chunk| collect(chunk_fragment(chunk))),
        ModelReply::Body(Value::Array(records)) => records.iter().for_each(|record| collect(record_fragment(record))),
        _ => return Err("not a chunk sequence"),
    }

    debug!(fragments, skipped, "extract_stream: accumulated");
    if fragments == 0 {
        return Err("no fragments recovered");
    }
    non_empty(text, "fragments are empty")
}

/// Strategy 4: the reply's own textual form, unless it is an unresolved handle
fn extract_stringified(reply: &ModelReply) -> Attempt {
    let text = match reply {
        ModelReply::Opaque(text) => text,
        ModelReply::Body(Value::String(text)) => text,
        ModelReply::Body(_) => return Err("structured reply has no text form"),
        ModelReply::Chunks(_) => return Err("chunk sequence has no text form"),
    };
    if is_unresolved_handle(text) {
        warn!("extract_stringified: reply is an unresolved stream handle");
        return Err("unresolved stream handle");
    }
    non_empty(text.clone(), "reply text is empty")
}

#[derive(Debug, Deserialize)]
struct StreamRecord {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

fn chunk_fragment(chunk: &ReplyChunk) -> Option<String> {
    match chunk {
        ReplyChunk::Record(record) => record_fragment(record),
        ReplyChunk::Raw(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(record) => record_fragment(&record),
            Err(_) => {
                debug!(raw_len = raw.len(), "chunk_fragment: skipping undecodable chunk");
                None
            }
        },
    }
}

/// Pull the partial content out of one chunk record
///
/// Each choice contributes its `delta.content`, or `text` when there is no
/// delta content, in choice order. Records whose choices do not decode
/// cleanly are scanned field by field instead.
fn record_fragment(record: &Value) -> Option<String> {
    if let Ok(parsed) = StreamRecord::deserialize(record) {
        let text: String = parsed
            .choices
            .into_iter()
            .filter_map(|choice| choice.delta.and_then(|d| d.content).or(choice.text))
            .collect();
        if !text.is_empty() {
            return Some(text);
        }
    }

    let choices = record.get("choices")?.as_array()?;
    let text: String = choices
        .iter()
        .filter_map(|choice| {
            choice
                .pointer("/delta/content")
                .and_then(Value::as_str)
                .or_else(|| choice.get("text").and_then(Value::as_str))
        })
        .collect();
    if text.is_empty() { None } else { Some(text) }
}
