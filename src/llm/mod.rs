//! LLM domain - wire types, completion client, and prompt construction.

pub mod client;
pub mod prompts;
pub mod types;

pub use client::{strip_surrounding_quotes, ChatTransport, OpenAiClient, MODEL};
pub use types::{ChatMessage, ChatRequest, ContentPart, MessageContent};
