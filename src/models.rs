use std::fmt;
use std::str::FromStr;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::constants::DEFAULT_API_KEY_HEADER;
use crate::error::ValidationError;

/// Loosely typed JSON object used for params, payload and headers
pub type JsonMap = Map<String, Value>;

/// HTTP Method enum
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl HttpMethod {
    /// Order offered by the creation workflow
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::GET,
        HttpMethod::POST,
        HttpMethod::DELETE,
        HttpMethod::PUT,
        HttpMethod::PATCH,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
        }
    }

    /// POST, PUT and PATCH carry a JSON payload; GET and DELETE carry query params
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::POST | HttpMethod::PUT | HttpMethod::PATCH)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::GET),
            "POST" => Ok(HttpMethod::POST),
            "PUT" => Ok(HttpMethod::PUT),
            "PATCH" => Ok(HttpMethod::PATCH),
            "DELETE" => Ok(HttpMethod::DELETE),
            _ => Err(ValidationError::UnsupportedMethod(s.to_string())),
        }
    }
}

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

/// Authentication attached to a request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthConfig {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
    ApiKey {
        key: String,
        #[serde(default = "default_api_key_header")]
        header: String,
    },
}

impl AuthConfig {
    /// Name of the header this auth injects, if any
    pub fn header_name(&self) -> Option<&str> {
        match self {
            AuthConfig::None => None,
            AuthConfig::Bearer { .. } | AuthConfig::Basic { .. } => Some("Authorization"),
            AuthConfig::ApiKey { header, .. } if header.trim().is_empty() => {
                Some(DEFAULT_API_KEY_HEADER)
            }
            AuthConfig::ApiKey { header, .. } => Some(header.as_str()),
        }
    }

    /// Header value as sent on the wire
    pub fn header_value(&self) -> Option<String> {
        match self {
            AuthConfig::None => None,
            AuthConfig::Bearer { token } => Some(format!("Bearer {}", token)),
            AuthConfig::Basic { username, password } => {
                let credentials = format!("{}:{}", username, password);
                let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
                Some(format!("Basic {}", encoded))
            }
            AuthConfig::ApiKey { key, .. } => Some(key.clone()),
        }
    }

    /// Short label for detail views; never includes secrets
    pub fn kind(&self) -> &'static str {
        match self {
            AuthConfig::None => "None",
            AuthConfig::Bearer { .. } => "Bearer Token",
            AuthConfig::Basic { .. } => "Basic Auth",
            AuthConfig::ApiKey { .. } => "API Key",
        }
    }
}

/// A named, persisted HTTP request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub name: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: JsonMap,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub payload: JsonMap,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub headers: JsonMap,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub insecure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<JsonMap, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<JsonMap>::deserialize(deserializer)?.unwrap_or_default())
}

impl Request {
    pub fn new(name: impl Into<String>, method: HttpMethod, url: impl Into<String>) -> Self {
        Request {
            name: name.into(),
            method,
            url: url.into(),
            params: JsonMap::new(),
            payload: JsonMap::new(),
            headers: JsonMap::new(),
            insecure: false,
            auth: None,
        }
    }

    /// Effective auth, treating an absent config as `None`
    pub fn auth(&self) -> &AuthConfig {
        static NONE: AuthConfig = AuthConfig::None;
        self.auth.as_ref().unwrap_or(&NONE)
    }

    /// Re-checks an already typed request, e.g. one edited as raw JSON
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.url.trim().is_empty() {
            return Err(ValidationError::EmptyUrl);
        }
        // params and payload never coexist: the method class picks one
        let (misplaced, field) = if self.method.has_body() {
            (&self.params, "params")
        } else {
            check_string_values(&self.params)?;
            (&self.payload, "payload")
        };
        if !misplaced.is_empty() {
            return Err(ValidationError::MisplacedField {
                field,
                method: self.method.to_string(),
            });
        }
        Ok(())
    }

    /// Query params that are sent: string values only, sorted by key
    pub fn query_pairs(&self) -> Vec<(&str, &str)> {
        if self.method.has_body() {
            return Vec::new();
        }
        // serde_json's Map keeps keys sorted
        self.params
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
            .collect()
    }

    /// The URL with query params merged into its query string
    pub fn target_url(&self) -> Result<Url, ValidationError> {
        let mut url = Url::parse(self.url.trim()).map_err(|e| ValidationError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        let params = self.query_pairs();
        if params.is_empty() {
            return Ok(url);
        }

        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.extend(params.into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        url.query_pairs_mut().clear().extend_pairs(pairs);
        Ok(url)
    }

    /// Headers with string values, in key order
    pub fn string_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
    }

    /// User headers that survive auth injection; auth wins on a name collision
    pub fn user_headers(&self) -> Vec<(&str, &str)> {
        let auth_header = self.auth().header_name();
        self.string_headers()
            .filter(|(k, _)| !auth_header.is_some_and(|a| a.eq_ignore_ascii_case(k)))
            .collect()
    }

    /// Every header exactly as it goes on the wire, auth last
    pub fn wire_headers(&self) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .user_headers()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let auth = self.auth();
        if let (Some(name), Some(value)) = (auth.header_name(), auth.header_value()) {
            headers.push((name.to_string(), value));
        }
        headers
    }

    /// JSON body for methods that carry one
    pub fn body(&self) -> Result<Option<String>, serde_json::Error> {
        if self.method.has_body() {
            serde_json::to_string(&self.payload).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Untyped request input as typed by a user or passed by an agent
#[derive(Clone, Debug, Default)]
pub struct RequestDraft {
    pub name: String,
    pub method: String,
    pub url: String,
    pub params: Option<String>,
    pub payload: Option<String>,
    pub headers: Option<String>,
    pub insecure: bool,
    pub auth: Option<AuthConfig>,
}

impl RequestDraft {
    /// Turns loose input into a Request, or says precisely what is wrong
    pub fn validate(self) -> Result<Request, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let method: HttpMethod = self.method.parse()?;
        if self.url.trim().is_empty() {
            return Err(ValidationError::EmptyUrl);
        }

        let mut request = Request::new(self.name.trim(), method, self.url.trim());

        if method.has_body() {
            if let Some(payload) = non_blank(self.payload.as_deref()) {
                request.payload = parse_object("payload", payload)?;
            }
            if non_blank(self.params.as_deref()).is_some() {
                tracing::warn!(method = %method, "Ignoring params on a method that carries a body");
            }
        } else {
            if let Some(params) = non_blank(self.params.as_deref()) {
                request.params = parse_params(params)?;
            }
            if non_blank(self.payload.as_deref()).is_some() {
                tracing::warn!(method = %method, "Ignoring payload on a method without a body");
            }
        }

        if let Some(headers) = non_blank(self.headers.as_deref()) {
            request.headers = parse_object("headers", headers)?;
        }

        request.insecure = self.insecure;
        request.auth = self.auth.filter(|a| *a != AuthConfig::None);
        Ok(request)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Parses a JSON object, naming the field on failure
pub fn parse_object(field: &'static str, input: &str) -> Result<JsonMap, ValidationError> {
    match serde_json::from_str::<Value>(input) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ValidationError::NotAnObject {
            field,
            reason: format!("expected a JSON object, got {}", json_type(&other)),
        }),
        Err(e) => Err(ValidationError::NotAnObject {
            field,
            reason: e.to_string(),
        }),
    }
}

/// Parses query params: a JSON object whose values are all strings
pub fn parse_params(input: &str) -> Result<JsonMap, ValidationError> {
    let map = parse_object("params", input)?;
    check_string_values(&map)?;
    Ok(map)
}

fn check_string_values(map: &JsonMap) -> Result<(), ValidationError> {
    match map.iter().find(|(_, v)| !v.is_string()) {
        Some((key, value)) => Err(ValidationError::ParamType {
            key: key.clone(),
            actual: json_type(value),
        }),
        None => Ok(()),
    }
}

/// Name of a JSON value's type as shown in messages
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(method: &str) -> RequestDraft {
        RequestDraft {
            name: "ex".into(),
            method: method.into(),
            url: "http://x/get".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_defaults_to_empty_maps() {
        let req = draft("get").validate().unwrap();
        assert_eq!(req.method, HttpMethod::GET);
        assert!(req.params.is_empty());
        assert!(req.headers.is_empty());
        assert!(req.auth.is_none());

        let stored = serde_json::to_value(&req).unwrap();
        assert_eq!(stored["headers"], json!({}));
        assert!(stored.get("params").is_none());
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut d = draft("GET");
        d.name = "  ".into();
        assert_eq!(d.validate(), Err(ValidationError::EmptyName));

        let mut d = draft("GET");
        d.url.clear();
        assert_eq!(d.validate(), Err(ValidationError::EmptyUrl));

        assert_eq!(
            draft("HEAD").validate(),
            Err(ValidationError::UnsupportedMethod("HEAD".into()))
        );
    }

    #[test]
    fn test_params_must_be_strings() {
        let mut d = draft("GET");
        d.params = Some(r#"{"q": "1", "count": 42}"#.into());
        assert_eq!(
            d.validate(),
            Err(ValidationError::ParamType {
                key: "count".into(),
                actual: "number"
            })
        );
    }

    #[test]
    fn test_payload_and_headers_must_be_objects() {
        let mut d = draft("POST");
        d.payload = Some("[1, 2]".into());
        assert!(matches!(
            d.validate(),
            Err(ValidationError::NotAnObject { field: "payload", .. })
        ));

        let mut d = draft("POST");
        d.headers = Some("not json".into());
        assert!(matches!(
            d.validate(),
            Err(ValidationError::NotAnObject { field: "headers", .. })
        ));
    }

    #[test]
    fn test_params_and_payload_follow_method_class() {
        let mut d = draft("PATCH");
        d.params = Some(r#"{"q": "1"}"#.into());
        d.payload = Some(r#"{"count": 42}"#.into());
        let req = d.validate().unwrap();
        assert!(req.params.is_empty());
        assert_eq!(req.payload["count"], json!(42));
        assert_eq!(req.body().unwrap().as_deref(), Some(r#"{"count":42}"#));

        let mut d = draft("DELETE");
        d.payload = Some(r#"{"count": 42}"#.into());
        let req = d.validate().unwrap();
        assert!(req.payload.is_empty());
        assert_eq!(req.body().unwrap(), None);
    }

    #[test]
    fn test_target_url_encodes_and_skips_non_strings() {
        let mut req = Request::new("ex", HttpMethod::GET, "http://x/get?z=last");
        req.params.insert("q".into(), json!("a b&c"));
        req.params.insert("n".into(), json!(3));
        req.params.insert("a".into(), json!("1"));
        let url = req.target_url().unwrap();
        assert_eq!(url.query(), Some("a=1&q=a+b%26c&z=last"));
    }

    #[test]
    fn test_target_url_untouched_without_params() {
        let req = Request::new("ex", HttpMethod::POST, "https://example.com/post?x=1");
        assert_eq!(req.target_url().unwrap().as_str(), "https://example.com/post?x=1");
        assert!(Request::new("ex", HttpMethod::GET, "not a url").target_url().is_err());
    }

    #[test]
    fn test_auth_overrides_colliding_header() {
        let mut req = Request::new("ex", HttpMethod::GET, "http://x");
        req.headers.insert("authorization".into(), json!("secret"));
        req.headers.insert("Accept".into(), json!("application/json"));
        req.headers.insert("X-Num".into(), json!(1));
        req.auth = Some(AuthConfig::Bearer { token: "abc".into() });

        assert_eq!(
            req.wire_headers(),
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Authorization".to_string(), "Bearer abc".to_string()),
            ]
        );
    }

    #[test]
    fn test_basic_and_api_key_headers() {
        let basic = AuthConfig::Basic {
            username: "user".into(),
            password: "pass".into(),
        };
        assert_eq!(basic.header_value().as_deref(), Some("Basic dXNlcjpwYXNz"));

        let api_key = AuthConfig::ApiKey {
            key: "k".into(),
            header: String::new(),
        };
        assert_eq!(api_key.header_name(), Some("X-API-Key"));
    }

    #[test]
    fn test_stored_shape() {
        let stored = json!({
            "name": "keyed",
            "method": "GET",
            "url": "http://x",
            "headers": null,
            "auth": {"type": "api-key", "key": "k"}
        });
        let req: Request = serde_json::from_value(stored).unwrap();
        assert!(req.headers.is_empty());
        assert_eq!(
            req.auth,
            Some(AuthConfig::ApiKey {
                key: "k".into(),
                header: "X-API-Key".into()
            })
        );

        let back = serde_json::to_value(&req).unwrap();
        assert_eq!(back["auth"]["type"], "api-key");
        assert!(back.get("insecure").is_none());
    }

    #[test]
    fn test_check_rejects_map_of_the_other_method_class() {
        let get: Request = serde_json::from_value(json!({
            "name": "ex", "method": "GET", "url": "http://x/get", "payload": {"a": 1}
        }))
        .unwrap();
        assert_eq!(
            get.check(),
            Err(ValidationError::MisplacedField {
                field: "payload",
                method: "GET".into()
            })
        );

        let mut post = Request::new("ex", HttpMethod::POST, "http://x/post");
        post.params.insert("q".into(), json!("1"));
        assert_eq!(
            post.check().unwrap_err().to_string(),
            "POST requests do not carry params"
        );

        post.params.clear();
        post.payload.insert("a".into(), json!(1));
        assert_eq!(post.check(), Ok(()));
    }
}
