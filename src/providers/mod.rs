//! Vendor transports.

pub mod openai;

pub use openai::OpenAIChatTransport;
