//! Agent tool surface
//!
//! Each tool is a thin translation onto the same engine and store the
//! interactive workflows use. User-level failures come back as error results
//! the agent can read; only storage failures abort the call.

pub mod server;

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::curl::to_curl;
use crate::error::{Result, TankerError, ValidationError};
use crate::models::{AuthConfig, JsonMap, Request, RequestDraft};
use crate::network::HttpEngine;
use crate::storage::Storage;

pub use server::serve;

/// Name given to ad-hoc requests that are never stored
const CUSTOM_REQUEST_NAME: &str = "custom";

/// Result of one tool call, as reported to the agent
#[derive(Clone, Debug, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub structured: Option<Value>,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        ToolOutput {
            text: text.into(),
            structured: None,
            is_error: false,
        }
    }

    pub fn json(value: Value) -> Self {
        ToolOutput {
            text: serde_json::to_string_pretty(&value).unwrap_or_default(),
            structured: Some(value),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ToolOutput {
            text: message.into(),
            structured: None,
            is_error: true,
        }
    }
}

/// Tool call failures that are not the agent's fault
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Internal(TankerError),
}

pub struct ToolBox {
    engine: HttpEngine,
    store: Arc<Storage>,
}

impl ToolBox {
    pub fn new(engine: HttpEngine, store: Arc<Storage>) -> Self {
        ToolBox { engine, store }
    }

    /// Runs one tool
    pub async fn call(&self, name: &str, args: &JsonMap) -> std::result::Result<ToolOutput, ToolError> {
        tracing::info!(tool = name, "Tool call");
        let outcome = match name {
            "list_requests" => self.list_requests(),
            "get_request" => self.get_request(args),
            "send_request" => self.send_request(args).await,
            "send_custom_request" => self.send_custom_request(args).await,
            "save_request" => self.save_request(args),
            "delete_request" => self.delete_request(args),
            "curl_command" => self.curl_command(args),
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };

        match outcome {
            Ok(output) => Ok(output),
            Err(TankerError::Storage(e)) => {
                tracing::error!(tool = name, error = %e, "Tool call failed");
                Err(ToolError::Internal(e.into()))
            }
            Err(TankerError::Execution(e)) => {
                Ok(ToolOutput::error(format!("HTTP request failed: {}", e)))
            }
            Err(e) => Ok(ToolOutput::error(e.to_string())),
        }
    }

    fn list_requests(&self) -> Result<ToolOutput> {
        let requests: Vec<Value> = self
            .store
            .list()?
            .iter()
            .map(|r| json!({"name": r.name, "method": r.method, "url": r.url}))
            .collect();
        Ok(ToolOutput::json(json!({ "requests": requests })))
    }

    fn get_request(&self, args: &JsonMap) -> Result<ToolOutput> {
        let request = self.store.get(required_str(args, "name")?)?;
        Ok(ToolOutput::json(serde_json::to_value(&request)?))
    }

    async fn send_request(&self, args: &JsonMap) -> Result<ToolOutput> {
        let request = self.store.get(required_str(args, "name")?)?;
        self.execute(&request, optional_str(args, "output_file")).await
    }

    async fn send_custom_request(&self, args: &JsonMap) -> Result<ToolOutput> {
        let mut draft = draft_from(args)?;
        draft.name = CUSTOM_REQUEST_NAME.to_string();
        let request = draft.validate()?;
        self.execute(&request, optional_str(args, "output_file")).await
    }

    /// Executes and reports; binary bodies are saved or removed before returning
    async fn execute(&self, request: &Request, output_file: Option<&str>) -> Result<ToolOutput> {
        let mut response = self.engine.execute(request).await?;
        let mut document = response.to_json();

        if let (Some(path), true) = (output_file, response.is_binary()) {
            let key_value = match response.save_to_file(Path::new(path)) {
                Ok(()) => ("savedTo", Value::from(path)),
                Err(e) => ("saveError", Value::from(e.to_string())),
            };
            if let Value::Object(map) = &mut document {
                map.insert(key_value.0.to_string(), key_value.1);
            }
        }
        response.cleanup();

        Ok(ToolOutput::json(document))
    }

    fn save_request(&self, args: &JsonMap) -> Result<ToolOutput> {
        let mut draft = draft_from(args)?;
        draft.name = required_str(args, "name")?.to_string();
        draft.auth = match args.get("auth") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value::<AuthConfig>(value.clone())
                    .map_err(|e| ValidationError::Auth(e.to_string()))?,
            ),
        };

        let request = draft.validate()?;
        let name = request.name.clone();
        self.store.put(request)?;
        Ok(ToolOutput::text(format!("Request {:?} saved successfully", name)))
    }

    fn delete_request(&self, args: &JsonMap) -> Result<ToolOutput> {
        let name = required_str(args, "name")?;
        self.store.delete(name)?;
        Ok(ToolOutput::text(format!("Request {:?} deleted successfully", name)))
    }

    fn curl_command(&self, args: &JsonMap) -> Result<ToolOutput> {
        let request = self.store.get(required_str(args, "name")?)?;
        Ok(ToolOutput::text(to_curl(&request)))
    }
}

fn required_str<'a>(args: &'a JsonMap, key: &'static str) -> Result<&'a str, ValidationError> {
    optional_str(args, key).ok_or(ValidationError::MissingArgument(key))
}

fn optional_str<'a>(args: &'a JsonMap, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// A JSON fragment given either as a string or as an object
fn fragment(args: &JsonMap, key: &'static str) -> Result<Option<String>, ValidationError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(value @ Value::Object(_)) => Ok(Some(value.to_string())),
        Some(other) => Err(ValidationError::NotAnObject {
            field: key,
            reason: format!("expected a JSON object, got {}", crate::models::json_type(other)),
        }),
    }
}

fn draft_from(args: &JsonMap) -> Result<RequestDraft, ValidationError> {
    Ok(RequestDraft {
        name: String::new(),
        method: required_str(args, "method")?.to_string(),
        url: required_str(args, "url")?.to_string(),
        params: fragment(args, "params")?,
        payload: fragment(args, "payload")?,
        headers: fragment(args, "headers")?,
        insecure: args.get("insecure").and_then(Value::as_bool).unwrap_or(false),
        auth: None,
    })
}

fn string_prop(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn fragment_prop(description: &str) -> Value {
    json!({"type": ["string", "object"], "description": description})
}

fn method_prop() -> Value {
    json!({
        "type": "string",
        "description": "HTTP method",
        "enum": ["GET", "POST", "PUT", "PATCH", "DELETE"]
    })
}

/// Schema of the request fields shared by custom sends and saves
fn request_props(extra: Vec<(&str, Value)>) -> Value {
    let mut props = JsonMap::new();
    for (key, value) in extra {
        props.insert(key.to_string(), value);
    }
    props.insert("method".into(), method_prop());
    props.insert("url".into(), string_prop("Target URL"));
    props.insert(
        "params".into(),
        fragment_prop("Query parameters as a JSON object of strings, e.g. {\"key\": \"value\"}"),
    );
    props.insert(
        "payload".into(),
        fragment_prop("Request body as a JSON object (for POST/PUT/PATCH)"),
    );
    props.insert(
        "headers".into(),
        fragment_prop("HTTP headers as a JSON object, e.g. {\"Content-Type\": \"application/json\"}"),
    );
    props.insert(
        "insecure".into(),
        json!({"type": "boolean", "description": "Skip TLS certificate verification (default: false)"}),
    );
    Value::Object(props)
}

fn tool(
    name: &str,
    description: &str,
    properties: Value,
    required: &[&str],
    (read_only, destructive, open_world): (bool, bool, bool),
) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": properties,
            "required": required,
        },
        "annotations": {
            "readOnlyHint": read_only,
            "destructiveHint": destructive,
            "openWorldHint": open_world,
        }
    })
}

/// Tool descriptors returned by `tools/list`
pub fn definitions() -> Vec<Value> {
    let name = || string_prop("Name of the saved request");
    let output_file = || {
        string_prop(
            "File path to save binary response content (e.g. /tmp/image.png). Only used for binary responses.",
        )
    };
    vec![
        tool(
            "list_requests",
            "List all saved HTTP requests with their names, methods, and URLs",
            json!({}),
            &[],
            (true, false, false),
        ),
        tool(
            "get_request",
            "Get full details of a saved HTTP request by name",
            json!({ "name": name() }),
            &["name"],
            (true, false, false),
        ),
        tool(
            "send_request",
            "Execute a saved HTTP request by name and return the response. For binary responses (images, PDFs, archives...), only metadata is returned. Use output_file to save binary content to disk.",
            json!({ "name": name(), "output_file": output_file() }),
            &["name"],
            (false, false, true),
        ),
        tool(
            "send_custom_request",
            "Execute an ad-hoc HTTP request without saving it. For binary responses (images, PDFs, archives...), only metadata is returned. Use output_file to save binary content to disk.",
            request_props(vec![("output_file", output_file())]),
            &["method", "url"],
            (false, false, true),
        ),
        tool(
            "save_request",
            "Save a new HTTP request to the database. This tool overwrites any existing request with the same name. Before calling this tool, ask the user whether to add query parameters, a request body (payload), headers or authentication.",
            request_props(vec![
                ("name", string_prop("Unique name for the request")),
                (
                    "auth",
                    json!({
                        "type": "object",
                        "description": "Authentication: {\"type\": \"bearer\", \"token\"}, {\"type\": \"basic\", \"username\", \"password\"} or {\"type\": \"api-key\", \"key\", \"header\"}"
                    }),
                ),
            ]),
            &["name", "method", "url"],
            (false, false, false),
        ),
        tool(
            "delete_request",
            "Delete a saved HTTP request by name",
            json!({ "name": string_prop("Name of the request to delete") }),
            &["name"],
            (false, true, false),
        ),
        tool(
            "curl_command",
            "Generate the equivalent cURL command for a saved HTTP request",
            json!({ "name": name() }),
            &["name"],
            (true, false, false),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> JsonMap {
        match value {
            Value::Object(map) => map,
            _ => JsonMap::new(),
        }
    }

    #[test]
    fn test_fragment_accepts_strings_and_objects() {
        let a = args(json!({"params": {"q": "1"}, "headers": "{\"A\": \"b\"}", "payload": ""}));
        assert_eq!(fragment(&a, "params").unwrap().as_deref(), Some(r#"{"q":"1"}"#));
        assert_eq!(fragment(&a, "headers").unwrap().as_deref(), Some(r#"{"A": "b"}"#));
        assert_eq!(fragment(&a, "payload").unwrap(), None);

        let bad = args(json!({"params": [1]}));
        assert!(matches!(
            fragment(&bad, "params"),
            Err(ValidationError::NotAnObject { field: "params", .. })
        ));
    }

    #[test]
    fn test_missing_argument() {
        let a = args(json!({"url": "http://x"}));
        let err = draft_from(&a).unwrap_err();
        assert_eq!(err.to_string(), "missing required parameter: method");
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let names: Vec<String> = definitions()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "list_requests",
                "get_request",
                "send_request",
                "send_custom_request",
                "save_request",
                "delete_request",
                "curl_command"
            ]
        );
        let save = &definitions()[4];
        assert_eq!(save["inputSchema"]["required"], json!(["name", "method", "url"]));
        assert!(save["inputSchema"]["properties"]["auth"].is_object());
    }
}
