use serde_json::Value;
use url::Url;

use crate::error::ValidationError;
use crate::models::{parse_object, AuthConfig, HttpMethod, Request};

/// Line continuation between flag pairs
const CONTINUATION: &str = " \\\n  ";

/// Format request as a shell-pasteable cURL command.
///
/// Pure function of the request: the URL carries the same query encoding as
/// execution, and headers are exactly the wire headers, so the command sends
/// what [`crate::network::HttpEngine`] would send.
pub fn to_curl(request: &Request) -> String {
    let mut parts = vec!["curl".to_string()];

    parts.push(format!("-X {}", request.method));

    if request.insecure {
        parts.push("-k".to_string());
    }

    let url = request
        .target_url()
        .map(|u| u.to_string())
        .unwrap_or_else(|_| request.url.clone());
    parts.push(shell_quote(&url));

    // Basic auth goes through -u, everything else is a plain header
    let headers = match request.auth() {
        AuthConfig::Basic { username, password } => {
            parts.push(format!("-u {}", shell_quote(&format!("{}:{}", username, password))));
            request
                .user_headers()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }
        _ => request.wire_headers(),
    };
    for (key, value) in headers {
        parts.push(format!("-H {}", shell_quote(&format!("{}: {}", key, value))));
    }

    if let Ok(Some(body)) = request.body() {
        parts.push(format!("-d {}", shell_quote(&body)));
    }

    parts.join(CONTINUATION)
}

/// Single-quotes a value for POSIX shells
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Parse a cURL command into an unnamed Request
pub fn parse_curl(input: &str) -> Result<Request, ValidationError> {
    let mut request = Request::new("", HttpMethod::GET, "");
    let mut explicit_method = false;
    let mut has_data = false;

    // Remove line continuations and normalize
    let normalized = input.replace("\\\r\n", " ").replace("\\\n", " ");

    let mut tokens = tokenize(&normalized)?;

    // Skip 'curl' command if present
    if tokens.first().map(|s| s.as_str()) == Some("curl") {
        tokens.remove(0);
    }

    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .ok_or_else(|| ValidationError::Curl(format!("missing value after {}", flag)))
        };

        match token.as_str() {
            "-X" | "--request" => {
                request.method = value(&token)?.parse()?;
                explicit_method = true;
            }
            "-H" | "--header" => {
                let header = value(&token)?;
                let (key, val) = header
                    .split_once(':')
                    .ok_or_else(|| ValidationError::Curl(format!("invalid header format: {}", header)))?;
                let (key, val) = (key.trim(), val.trim());
                match val.strip_prefix("Bearer ") {
                    Some(token) if key.eq_ignore_ascii_case("authorization") => {
                        request.auth = Some(AuthConfig::Bearer {
                            token: token.to_string(),
                        });
                    }
                    _ => {
                        request.headers.insert(key.to_string(), Value::from(val));
                    }
                }
            }
            "-d" | "--data" | "--data-raw" | "--data-binary" => {
                request.payload = parse_object("payload", &value(&token)?)?;
                has_data = true;
            }
            "-u" | "--user" => {
                let credentials = value(&token)?;
                let (username, password) = credentials
                    .split_once(':')
                    .unwrap_or((credentials.as_str(), ""));
                request.auth = Some(AuthConfig::Basic {
                    username: username.to_string(),
                    password: password.to_string(),
                });
            }
            "--url" => {
                request.url = value(&token)?;
            }
            "-k" | "--insecure" => request.insecure = true,
            "--compressed" | "-L" | "--location" | "-s" | "--silent" | "-v" | "--verbose" => {
                // Ignored flags
            }
            other if other.starts_with("http://") || other.starts_with("https://") => {
                request.url = other.to_string();
            }
            other => {
                tracing::debug!(token = other, "Ignoring unknown cURL token");
            }
        }
    }

    if request.url.is_empty() {
        return Err(ValidationError::Curl("missing URL".to_string()));
    }

    // Infer POST if data was given without a method
    if has_data && !explicit_method {
        request.method = HttpMethod::POST;
    }

    if !request.method.has_body() {
        request.payload.clear();
        lift_query_into_params(&mut request);
    }

    Ok(request)
}

/// Moves a GET/DELETE query string into params so the request stays editable
fn lift_query_into_params(request: &mut Request) {
    let Ok(mut url) = Url::parse(&request.url) else {
        return;
    };
    if url.query().is_none() {
        return;
    }
    for (key, value) in url.query_pairs() {
        request
            .params
            .insert(key.into_owned(), Value::from(value.into_owned()));
    }
    url.set_query(None);
    request.url = url.to_string();
}

/// Tokenize a curl command, respecting quotes
fn tokenize(input: &str) -> Result<Vec<String>, ValidationError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;
    let mut quoted = false;

    for c in input.chars() {
        if escape_next {
            current.push(c);
            escape_next = false;
            continue;
        }

        match c {
            '\\' if !in_single_quote => {
                escape_next = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                quoted = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                quoted = true;
            }
            ' ' | '\t' | '\n' | '\r' if !in_single_quote && !in_double_quote => {
                if !current.is_empty() || quoted {
                    tokens.push(std::mem::take(&mut current));
                    quoted = false;
                }
            }
            _ => {
                current.push(c);
            }
        }
    }

    if in_single_quote || in_double_quote {
        return Err(ValidationError::Curl("unterminated quote".to_string()));
    }

    if !current.is_empty() || quoted {
        tokens.push(current);
    }

    Ok(tokens)
}
