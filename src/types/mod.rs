//! Canonical wire model shared by every vendor.

pub mod config;
pub mod message;
pub mod parts;
pub mod request;
pub mod streaming;
pub mod tools;

// Re-export commonly used types
pub use config::*;
pub use message::*;
pub use parts::*;
pub use request::*;
pub use streaming::*;
pub use tools::*;
