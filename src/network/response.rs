//! Response of one execution, and the lifecycle of binary bodies on disk

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use regex::Regex;
use serde_json::{Map, Value};
use tempfile::TempPath;
use url::Url;

use crate::error::StateError;
use crate::models::JsonMap;

use super::classifier::media_type;

/// Response headers, grouped by name, in name order
pub type ResponseHeaders = BTreeMap<String, Vec<String>>;

/// Body outcome of classification
#[derive(Debug)]
pub enum Body {
    /// Text body that parsed as a JSON object
    Json(JsonMap),
    /// Any other text body
    Text(String),
    /// Non-text body streamed to a temporary file
    Binary(BinaryContent),
}

/// Binary body metadata plus the temporary file holding it
#[derive(Debug)]
pub struct BinaryContent {
    pub content_type: String,
    pub size: u64,
    /// Cleared once the file has been saved elsewhere or removed
    pub(crate) file: Option<TempPath>,
}

impl BinaryContent {
    /// Path of the temporary file, while it still exists
    pub fn temp_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

/// Transient result of one HTTP execution
#[derive(Debug)]
pub struct Response {
    pub status: String,
    pub status_code: u16,
    pub protocol: String,
    pub headers: ResponseHeaders,
    pub body: Body,
    pub execution_time_ms: u64,
}

impl Response {
    /// First value of a header, by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.body, Body::Binary(_))
    }

    pub fn binary(&self) -> Option<&BinaryContent> {
        match &self.body {
            Body::Binary(binary) => Some(binary),
            _ => None,
        }
    }

    /// Moves the binary body to `destination`.
    ///
    /// Tries a rename first and falls back to copy-then-delete, which covers
    /// destinations on another filesystem. On success the temporary file is
    /// gone and a second call fails with [`StateError::NoBinaryContent`]. On
    /// failure the temporary file is kept so that [`Response::cleanup`] can
    /// still remove it.
    pub fn save_to_file(&mut self, destination: impl AsRef<Path>) -> Result<(), StateError> {
        let destination = destination.as_ref();
        let Body::Binary(binary) = &mut self.body else {
            return Err(StateError::NoBinaryContent);
        };
        let Some(temp) = binary.file.take() else {
            return Err(StateError::NoBinaryContent);
        };

        let save_failed = |reason: String| StateError::SaveFailed {
            path: destination.to_path_buf(),
            reason,
        };

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                binary.file = Some(temp);
                return Err(save_failed(e.to_string()));
            }
        }

        let temp = match temp.persist(destination) {
            Ok(()) => {
                tracing::info!(path = %destination.display(), size = binary.size, "Binary body saved");
                return Ok(());
            }
            Err(err) => {
                tracing::debug!(error = %err.error, "Rename failed, copying instead");
                err.path
            }
        };

        match fs::copy(&temp, destination) {
            Ok(_) => {
                if let Err(e) = temp.close() {
                    tracing::warn!(error = %e, "Failed to remove temporary body file");
                }
                tracing::info!(path = %destination.display(), size = binary.size, "Binary body saved");
                Ok(())
            }
            Err(e) => {
                binary.file = Some(temp);
                Err(save_failed(e.to_string()))
            }
        }
    }

    /// Deletes the temporary file if it still exists. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        if let Body::Binary(binary) = &mut self.body {
            if let Some(temp) = binary.file.take() {
                if let Err(e) = temp.close() {
                    tracing::warn!(error = %e, "Failed to remove temporary body file");
                }
            }
        }
    }

    /// Default save location: Content-Disposition filename, else the last URL
    /// segment, else `download` with an extension matching the content type
    pub fn suggested_filename(&self, request_url: &str, download_dir: &Path) -> PathBuf {
        let from_disposition = self
            .header("content-disposition")
            .and_then(disposition_filename);

        let from_url = || {
            Url::parse(request_url).ok().and_then(|url| {
                url.path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
                    .filter(|segment| !segment.is_empty() && segment != ".")
            })
        };

        let name = from_disposition.or_else(from_url).unwrap_or_else(|| {
            let content_type = self
                .binary()
                .map(|b| b.content_type.clone())
                .or_else(|| self.header("content-type").map(str::to_string))
                .unwrap_or_default();
            let ext = mime_guess::get_mime_extensions_str(&media_type(&content_type))
                .and_then(|exts| exts.first())
                .map(|ext| format!(".{}", ext))
                .unwrap_or_default();
            format!("download{}", ext)
        });

        download_dir.join(name)
    }

    /// Inspection document: the full response as JSON
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("status".into(), Value::from(self.status.clone()));
        out.insert("statusCode".into(), Value::from(self.status_code));
        out.insert("proto".into(), Value::from(self.protocol.clone()));
        out.insert(
            "headers".into(),
            serde_json::to_value(&self.headers).unwrap_or(Value::Null),
        );
        match &self.body {
            Body::Json(map) => {
                out.insert("jsonBody".into(), Value::Object(map.clone()));
            }
            Body::Text(text) => {
                out.insert("body".into(), Value::from(text.clone()));
            }
            Body::Binary(binary) => {
                out.insert("contentType".into(), Value::from(binary.content_type.clone()));
                out.insert("bodySize".into(), Value::from(binary.size));
                out.insert("body".into(), Value::from("[Binary content not included]"));
            }
        }
        out.insert("executionTimeMillisec".into(), Value::from(self.execution_time_ms));
        Value::Object(out)
    }
}

/// Extracts a bare file name from a Content-Disposition header.
///
/// The RFC 5987 `filename*=charset'lang'value` form wins over `filename=`
/// and is percent-decoded.
fn disposition_filename(header: &str) -> Option<String> {
    let extended = Regex::new(r#"(?i)filename\*\s*=\s*[\w-]*'[^']*'([^;\s]+)"#).ok()?;
    let plain = Regex::new(r#"(?i)filename\s*=\s*"?([^";]+)"?"#).ok()?;

    let raw = match extended.captures(header).and_then(|c| c.get(1)) {
        Some(encoded) => percent_decode_str(encoded.as_str())
            .decode_utf8()
            .ok()?
            .into_owned(),
        None => plain.captures(header)?.get(1)?.as_str().trim().to_string(),
    };

    // Never let a server pick the directory
    Path::new(&raw)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}
