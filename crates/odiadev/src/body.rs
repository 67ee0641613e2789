//! Size-capped request body reading and JSON parsing.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("failed to read request body: {0}")]
    Read(String),
}

/// Accumulate a body stream, aborting as soon as more than `max_bytes` have
/// been received.
pub async fn read_body<S, E>(mut stream: S, max_bytes: usize) -> Result<Bytes, BodyError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| BodyError::Read(e.to_string()))?;
        if buf.len() + chunk.len() > max_bytes {
            return Err(BodyError::TooLarge { limit: max_bytes });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Parse a JSON body. Empty or whitespace-only input yields `{}`.
pub fn parse_json_body(raw: &[u8]) -> Result<Value, BodyError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(raw).map_err(|e| BodyError::InvalidJson(e.to_string()))
}

/// [`read_body`] followed by [`parse_json_body`].
pub async fn read_json_body<S, E>(stream: S, max_bytes: usize) -> Result<Value, BodyError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let raw = read_body(stream, max_bytes).await?;
    parse_json_body(&raw)
}
