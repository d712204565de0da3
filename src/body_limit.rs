//! Size-bounded body reading.
//!
//! A declared `Content-Length` over the ceiling is refused before the body
//! is touched. Otherwise the body is pulled chunk by chunk and refused as
//! soon as the bytes actually read pass the ceiling, so an omitted or
//! understated length buys nothing.

use axum::{
    body::Body,
    http::{HeaderMap, header},
};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;

use crate::error::{AdmissionError, AdmissionResult};

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

pub async fn read_bytes_limited(
    headers: &HeaderMap,
    body: Body,
    max_bytes: usize,
) -> AdmissionResult<Bytes> {
    if let Some(declared) = declared_length(headers) {
        if declared > max_bytes as u64 {
            return Err(AdmissionError::PayloadTooLarge {
                limit: max_bytes,
                received: declared,
            });
        }
    }

    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| AdmissionError::MalformedBody(format!("failed to read body: {e}")))?;
        let read = buf.len() + chunk.len();
        if read > max_bytes {
            return Err(AdmissionError::PayloadTooLarge {
                limit: max_bytes,
                received: read as u64,
            });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}

/// Raw text, for bodies whose exact bytes matter (signed webhooks).
/// An empty body is `""`.
pub async fn read_text_limited(
    headers: &HeaderMap,
    body: Body,
    max_bytes: usize,
) -> AdmissionResult<String> {
    let bytes = read_bytes_limited(headers, body, max_bytes).await?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| AdmissionError::MalformedBody("body is not valid UTF-8".to_string()))
}

pub async fn read_json_limited<T: DeserializeOwned>(
    headers: &HeaderMap,
    body: Body,
    max_bytes: usize,
) -> AdmissionResult<T> {
    let bytes = read_bytes_limited(headers, body, max_bytes).await?;
    if bytes.is_empty() {
        return Err(AdmissionError::MalformedBody("request body is empty".to_string()));
    }
    Ok(serde_json::from_slice(&bytes)?)
}

// Same as `read_json_limited`, but an empty body yields `T::default()`.
pub async fn read_optional_json_limited<T: DeserializeOwned + Default>(
    headers: &HeaderMap,
    body: Body,
    max_bytes: usize,
) -> AdmissionResult<T> {
    let bytes = read_bytes_limited(headers, body, max_bytes).await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(&bytes)?)
}
