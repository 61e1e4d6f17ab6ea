//! Decoding of canonical wire payloads.
//!
//! Every decoder parses into closed tagged enums, so an unknown `pt`,
//! `type`, `role` or `dialect` is rejected, then checks value ranges. All
//! failures are [`Error::Validation`] naming the offending field.

use serde::de::DeserializeOwned;

use crate::types::{Access, ChatGenerateRequest, ChatMessage, DispatchRequest, Tool};
use crate::Error;

fn decode<T: DeserializeOwned>(what: &str, json: &str) -> Result<T, Error> {
    serde_json::from_str(json).map_err(|e| Error::validation(format!("{what}: {e}")))
}

pub fn decode_request(json: &str) -> Result<ChatGenerateRequest, Error> {
    let request: ChatGenerateRequest = decode("chatGenerate", json)?;
    request.validate()?;
    Ok(request)
}

pub fn decode_dispatch_request(json: &str) -> Result<DispatchRequest, Error> {
    let request: DispatchRequest = decode("request", json)?;
    request.validate()?;
    Ok(request)
}

pub fn decode_chat_message(json: &str) -> Result<ChatMessage, Error> {
    decode("chatMessage", json)
}

pub fn decode_tool(json: &str) -> Result<Tool, Error> {
    let tool: Tool = decode("tool", json)?;
    tool.validate()?;
    Ok(tool)
}

pub fn decode_access(json: &str) -> Result<Access, Error> {
    decode("access", json)
}
