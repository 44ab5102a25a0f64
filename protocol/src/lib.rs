//! OpenAI-compatible chat-completions wire types and SSE framing.
//!
//! This crate defines only the surface the gateway needs: the
//! `/v1/chat/completions` request/response/stream-chunk shapes and the
//! `data: {json}\n\n` ... `data: [DONE]\n\n` envelope helpers used on
//! both sides of the proxy (reading the upstream's stream, writing the
//! client's stream).

pub mod chat;
pub mod common;
pub mod sse;

pub use chat::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatChoice,
    ChatChoiceDelta, ChatMessage, Role,
};
pub use common::{StreamOptions, StringOrArray, Usage};
pub use sse::{SseEvent, DONE_EVENT};
