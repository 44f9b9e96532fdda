//! Response content classification
//!
//! Text bodies are buffered and decoded. Anything else is streamed chunk by
//! chunk into a private temporary file, so large or untrusted payloads never
//! sit in memory as a whole.

use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::constants::BINARY_TEMP_PREFIX;
use crate::error::{BoxError, ExecutionError, TransportError};

use super::response::{BinaryContent, Body};

/// Non `text/*` media types that are still decoded as text
const TEXT_MEDIA_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/javascript",
    "application/ecmascript",
    "application/x-javascript",
    "application/xhtml+xml",
    "application/x-www-form-urlencoded",
    "application/graphql",
    "application/yaml",
    "application/x-yaml",
    "application/toml",
    "application/sql",
    "application/x-ndjson",
];

/// Lower-cased media type without parameters
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether a Content-Type names text. An empty value counts as text.
pub fn is_text_content(content_type: &str) -> bool {
    let media = media_type(content_type);
    media.is_empty()
        || media.starts_with("text/")
        || TEXT_MEDIA_TYPES.contains(&media.as_str())
        || media.ends_with("+json")
        || media.ends_with("+xml")
}

/// Decides text vs binary from the headers and consumes the body accordingly
pub async fn classify<S, B, E>(headers: &HeaderMap, body: S) -> Result<Body, ExecutionError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
{
    let content_type = match headers.get(CONTENT_TYPE) {
        None => None,
        Some(value) => Some(String::from_utf8_lossy(value.as_bytes()).into_owned()),
    };

    match content_type {
        Some(ct) if !is_text_content(&ct) => stream_to_temp_file(ct, body).await,
        _ => read_text(body).await,
    }
}

async fn read_text<S, B, E>(body: S) -> Result<Body, ExecutionError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
{
    let mut body = std::pin::pin!(body);
    let mut buf = Vec::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(body_error)?;
        buf.extend_from_slice(chunk.as_ref());
    }

    match serde_json::from_slice::<Value>(&buf) {
        Ok(Value::Object(map)) => Ok(Body::Json(map)),
        _ => Ok(Body::Text(String::from_utf8_lossy(&buf).into_owned())),
    }
}

async fn stream_to_temp_file<S, B, E>(content_type: String, body: S) -> Result<Body, ExecutionError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
{
    let named = tempfile::Builder::new()
        .prefix(BINARY_TEMP_PREFIX)
        .tempfile()
        .map_err(ExecutionError::TempFile)?;
    // The TempPath removes the file if anything below fails
    let (file, path) = named.into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut body = std::pin::pin!(body);
    let mut size: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(body_error)?;
        let bytes = chunk.as_ref();
        file.write_all(bytes).await.map_err(ExecutionError::TempFile)?;
        size += bytes.len() as u64;
    }
    file.flush().await.map_err(ExecutionError::TempFile)?;
    drop(file);

    tracing::debug!(content_type = %content_type, size, path = %path.display(), "Binary body streamed to disk");

    Ok(Body::Binary(BinaryContent {
        content_type,
        size,
        file: Some(path),
    }))
}

fn body_error<E: Into<BoxError>>(err: E) -> ExecutionError {
    TransportError::Body(err.into()).into()
}
