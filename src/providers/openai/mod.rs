//! OpenAI Chat Completions and compatible servers.

pub mod adapter;
pub mod client;
pub mod types;

pub use client::OpenAIChatTransport;
