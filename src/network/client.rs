//! HTTP execution engine - builds wire requests and produces classified responses

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::constants::{APP_NAME, APP_VERSION, DEFAULT_TIMEOUT};
use crate::error::{ExecutionError, TransportError, ValidationError};
use crate::models::{HttpMethod, Request};

use super::classifier::classify;
use super::response::{Response, ResponseHeaders};

/// Engine settings, fixed for the lifetime of its clients
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("{}/{}", APP_NAME, APP_VERSION),
        }
    }
}

/// Executes stored requests.
///
/// Holds two long-lived clients so connection pools survive across calls:
/// one verifying TLS peers, one that skips verification for requests marked
/// `insecure`.
#[derive(Clone)]
pub struct HttpEngine {
    default: reqwest::Client,
    insecure: reqwest::Client,
    timeout: Duration,
}

impl HttpEngine {
    pub fn new(config: EngineConfig) -> Result<Self, TransportError> {
        let default = create_client(&config, false)?;
        let insecure = create_client(&config, true)?;
        Ok(HttpEngine {
            default,
            insecure,
            timeout: config.timeout,
        })
    }

    fn client_for(&self, request: &Request) -> &reqwest::Client {
        if request.insecure {
            &self.insecure
        } else {
            &self.default
        }
    }

    /// Builds the wire request without sending it
    pub fn build(&self, request: &Request) -> Result<reqwest::Request, ExecutionError> {
        let client = self.client_for(request);
        let url = request.target_url()?;

        let method = match request.method {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::PATCH => reqwest::Method::PATCH,
            HttpMethod::DELETE => reqwest::Method::DELETE,
        };

        let mut req_builder = client.request(method, url).headers(header_map(request)?);

        // No implicit Content-Type: negotiation is left to explicit headers
        if let Some(body) = request.body()? {
            req_builder = req_builder.body(body);
        }

        req_builder
            .build()
            .map_err(|e| TransportError::from_reqwest(e, self.timeout.as_secs()).into())
    }

    /// Executes a request with the engine's timeout
    pub async fn execute(&self, request: &Request) -> Result<Response, ExecutionError> {
        self.execute_with_timeout(request, self.timeout).await
    }

    /// Executes a request once. There is no retry.
    pub async fn execute_with_timeout(
        &self,
        request: &Request,
        timeout: Duration,
    ) -> Result<Response, ExecutionError> {
        let mut wire = self.build(request)?;
        *wire.timeout_mut() = Some(timeout);

        if request.insecure {
            tracing::warn!(name = %request.name, url = %wire.url(), "TLS certificate verification disabled for this call");
        }
        tracing::info!(name = %request.name, method = %wire.method(), url = %wire.url(), "Executing request");

        let start = Instant::now();
        let result = self.client_for(request).execute(wire).await;
        let elapsed = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                tracing::info!(name = %request.name, error = %e, time_ms = elapsed, "Request failed");
                return Err(TransportError::from_reqwest(e, timeout.as_secs()).into());
            }
        };

        let status = resp.status();
        let status_text = match status.canonical_reason() {
            Some(reason) => format!("{} {}", status.as_u16(), reason),
            None => status.as_u16().to_string(),
        };
        let protocol = format!("{:?}", resp.version());
        let raw_headers = resp.headers().clone();

        let body = classify(&raw_headers, resp.bytes_stream()).await?;

        tracing::info!(name = %request.name, status = status.as_u16(), time_ms = elapsed, "Request completed");

        Ok(Response {
            status: status_text,
            status_code: status.as_u16(),
            protocol,
            headers: group_headers(&raw_headers),
            body,
            execution_time_ms: elapsed,
        })
    }
}

/// Wire headers as a map; auth is applied last and replaces colliding names
fn header_map(request: &Request) -> Result<HeaderMap, ValidationError> {
    let mut map = HeaderMap::new();
    for (name, value) in request.wire_headers() {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ValidationError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(&value).map_err(|e| ValidationError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn group_headers(headers: &HeaderMap) -> ResponseHeaders {
    let mut grouped = ResponseHeaders::new();
    for (name, value) in headers {
        grouped
            .entry(name.to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    grouped
}

/// Create an HTTP client with the engine configuration
fn create_client(config: &EngineConfig, insecure: bool) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .danger_accept_invalid_certs(insecure)
        .build()
        .map_err(TransportError::ClientBuild)
}
