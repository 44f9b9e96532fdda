//! Line-delimited JSON-RPC 2.0 over stdio for agent clients

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::{APP_NAME, APP_VERSION, MCP_PROTOCOL_VERSION};
use crate::models::JsonMap;

use super::{definitions, ToolBox, ToolError, ToolOutput};

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Deserialize)]
struct RpcMessage {
    #[serde(default)]
    id: Option<Value>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Default, Deserialize)]
struct CallParams {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: Option<JsonMap>,
}

/// Serves requests from `reader` until it reaches end of input
pub async fn serve<R, W>(toolbox: &ToolBox, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tracing::info!("Agent tool server started");
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(reply) = handle_line(toolbox, &line).await {
            let mut encoded = reply.to_string();
            encoded.push('\n');
            writer.write_all(encoded.as_bytes()).await?;
            writer.flush().await?;
        }
    }

    tracing::info!("Agent tool server input closed");
    Ok(())
}

/// Answers one message; notifications get no reply
async fn handle_line(toolbox: &ToolBox, line: &str) -> Option<Value> {
    let message: RpcMessage = match serde_json::from_str(line) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable message");
            return Some(error_reply(None, PARSE_ERROR, &format!("Parse error: {}", e)));
        }
    };

    let Some(method) = message.method else {
        return Some(error_reply(message.id, INVALID_REQUEST, "missing method field"));
    };
    let Some(id) = message.id else {
        tracing::debug!(method = %method, "Notification");
        return None;
    };

    let reply = match method.as_str() {
        "initialize" => result_reply(id, initialize(&message.params)),
        "ping" => result_reply(id, json!({})),
        "tools/list" => result_reply(id, json!({ "tools": definitions() })),
        "tools/call" => {
            let params: CallParams = match serde_json::from_value(message.params) {
                Ok(p) => p,
                Err(e) => return Some(error_reply(Some(id), INVALID_PARAMS, &e.to_string())),
            };
            let arguments = params.arguments.unwrap_or_default();
            match toolbox.call(&params.name, &arguments).await {
                Ok(output) => result_reply(id, call_result(output)),
                Err(e @ ToolError::UnknownTool(_)) => {
                    error_reply(Some(id), INVALID_PARAMS, &e.to_string())
                }
                Err(e @ ToolError::Internal(_)) => {
                    error_reply(Some(id), INTERNAL_ERROR, &e.to_string())
                }
            }
        }
        other => {
            tracing::debug!(method = other, "Unsupported method");
            error_reply(Some(id), METHOD_NOT_FOUND, &format!("Method not found: {}", other))
        }
    };
    Some(reply)
}

fn initialize(params: &Value) -> Value {
    let version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(MCP_PROTOCOL_VERSION);
    json!({
        "protocolVersion": version,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": APP_NAME, "version": APP_VERSION },
    })
}

fn call_result(output: ToolOutput) -> Value {
    let mut result = json!({
        "content": [{ "type": "text", "text": output.text }],
        "isError": output.is_error,
    });
    if let (Some(structured), Value::Object(map)) = (output.structured, &mut result) {
        map.insert("structuredContent".into(), structured);
    }
    result
}

fn result_reply(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_reply(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id.unwrap_or(Value::Null),
        "error": { "code": code, "message": message },
    })
}
