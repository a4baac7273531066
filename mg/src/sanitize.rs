//! Output sanitizer
//!
//! Strips markdown code fences from generated text and enforces a minimum
//! amount of content.

use thiserror::Error;
use tracing::debug;

/// Minimum characters a sanitized script must contain
pub const DEFAULT_MIN_LEN: usize = 40;

const FENCE: &str = "```";

/// Errors raised by the sanitizer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("Model returned empty or too-short response ({len} chars, minimum {min})")]
    TooShort { len: usize, min: usize },
}

/// Cleans model output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sanitizer {
    min_len: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LEN)
    }
}

impl Sanitizer {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Strip fences, trim, and check the length
    pub fn sanitize(&self, raw: &str) -> Result<String, SanitizeError> {
        debug!(raw_len = raw.len(), min_len = self.min_len, "Sanitizer::sanitize: called");
        let code = strip_fences(raw);
        let len = code.chars().count();
        if len < self.min_len {
            debug!(len, "Sanitizer::sanitize: too short");
            return Err(SanitizeError::TooShort { len, min: self.min_len });
        }
        Ok(code)
    }
}

/// Sanitize with the default minimum length
pub fn sanitize(raw: &str) -> Result<String, SanitizeError> {
    Sanitizer::default().sanitize(raw)
}

/// Remove a leading fence (with optional language tag) and a trailing fence
///
/// A single well-formed fenced block is unwrapped by the first pass. Passes
/// repeat until nothing changes so that the result is always a fixed point.
pub fn strip_fences(text: &str) -> String {
    let mut current = text.trim();
    loop {
        let next = strip_once(current);
        if next.len() == current.len() {
            return next.to_string();
        }
        current = next;
    }
}

fn strip_once(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix(FENCE) {
        let tag_len = rest.find(|c: char| !is_tag_char(c)).unwrap_or(rest.len());
        let after_tag = &rest[tag_len..];
        // A tag must end at whitespace; otherwise it is code on the fence line
        s = if after_tag.is_empty() || after_tag.starts_with(char::is_whitespace) {
            after_tag
        } else {
            rest
        };
    }
    if let Some(rest) = s.strip_suffix(FENCE) {
        s = rest;
    }
    s.trim()
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '.' | '#')
}
