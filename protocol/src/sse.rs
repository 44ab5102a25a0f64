//! SSE frame encode/decode matching the OpenAI chat-completions envelope:
//! `data: {json}\n\n`, terminated by the literal `data: [DONE]\n\n`.

use std::fmt;

use serde::Serialize;

pub const DONE_EVENT: &str = "data: [DONE]\n\n";

/// One outgoing SSE frame. `Done` is the terminal sentinel every stream
/// must emit exactly once (spec invariant: every stream ends with one
/// `data: [DONE]\n\n` line).
#[derive(Debug, Clone)]
pub enum SseEvent {
    Data(String),
    Done,
}

impl SseEvent {
    pub fn from_json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Data(serde_json::to_string(value)?))
    }
}

impl fmt::Display for SseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SseEvent::Data(json) => write!(f, "data: {}\n\n", json),
            SseEvent::Done => write!(f, "{}", DONE_EVENT),
        }
    }
}

/// Split a raw upstream byte chunk into complete `data: ...\n\n` frames,
/// returning the frames found and any trailing partial bytes to carry
/// over to the next read.
pub fn split_frames(buf: &str) -> (Vec<&str>, &str) {
    let mut frames = Vec::new();
    let mut rest = buf;
    while let Some(pos) = rest.find("\n\n") {
        frames.push(&rest[..pos]);
        rest = &rest[pos + 2..];
    }
    (frames, rest)
}

/// Extract the JSON payload from a single `data: ...` line, if present.
/// Returns `None` for blank lines, comments (`:`-prefixed), or the
/// `[DONE]` sentinel.
pub fn parse_data_line(frame: &str) -> Option<&str> {
    for line in frame.lines() {
        if let Some(payload) = line.strip_prefix("data:") {
            let payload = payload.trim();
            if payload.is_empty() || payload == "[DONE]" {
                return None;
            }
            return Some(payload);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_wraps_json_in_data_frame() {
        let event = SseEvent::Data(r#"{"a":1}"#.to_string());
        assert_eq!(event.to_string(), "data: {\"a\":1}\n\n");
    }

    #[test]
    fn display_done_is_exact_sentinel() {
        assert_eq!(SseEvent::Done.to_string(), DONE_EVENT);
    }

    #[test]
    fn split_frames_handles_partial_trailing_bytes() {
        let buf = "data: {\"a\":1}\n\ndata: {\"a\":2}\n\ndata: {\"a\":3";
        let (frames, rest) = split_frames(buf);
        assert_eq!(frames, vec!["data: {\"a\":1}", "data: {\"a\":2}"]);
        assert_eq!(rest, "data: {\"a\":3");
    }

    #[test]
    fn parse_data_line_skips_done_sentinel() {
        assert_eq!(parse_data_line("data: [DONE]"), None);
        assert_eq!(parse_data_line("data: {\"x\":true}"), Some("{\"x\":true}"));
    }
}
