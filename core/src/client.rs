//! Authenticated request dispatcher for the Jobs API.
//!
//! # Design
//! `ApiClient` holds an immutable `ClientConfig` and a `Transport`; it keeps
//! no mutable state between calls. Every call is split into `build_request`
//! (path normalization, query encoding, header merge, body, timeout) and
//! `parse_response` (status classification, content negotiation, error
//! enrichment). `request` glues the two halves around a single
//! `Transport::send`, with no retries.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ApiError, Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Payload};
use crate::transport::Transport;

/// Per-call options for `ApiClient::request`.
///
/// `json_body` takes precedence over `raw_body` when both are set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub query: Vec<(String, Value)>,
    pub json_body: Option<Value>,
    pub raw_body: Option<RawBody>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: impl Into<Value>) -> Self {
        self.json_body = Some(body.into());
        self
    }

    pub fn raw(mut self, body: impl Into<RawBody>) -> Self {
        self.raw_body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options accepted by `ApiClient::get`. No body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetOptions {
    pub query: Vec<(String, Value)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<GetOptions> for RequestOptions {
    fn from(options: GetOptions) -> Self {
        Self {
            query: options.query,
            headers: options.headers,
            timeout: options.timeout,
            ..Self::default()
        }
    }
}

/// Options accepted by `ApiClient::post`. No query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostOptions {
    pub json_body: Option<Value>,
    pub raw_body: Option<RawBody>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl PostOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, body: impl Into<Value>) -> Self {
        self.json_body = Some(body.into());
        self
    }

    pub fn raw(mut self, body: impl Into<RawBody>) -> Self {
        self.raw_body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<PostOptions> for RequestOptions {
    fn from(options: PostOptions) -> Self {
        Self {
            json_body: options.json_body,
            raw_body: options.raw_body,
            headers: options.headers,
            timeout: options.timeout,
            ..Self::default()
        }
    }
}

/// A non-JSON request body, sent as-is.
///
/// Default headers are left alone, so `Content-Type` stays
/// `application/json` unless the caller overrides it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBody {
    Bytes(Vec<u8>),
    /// URL-encoded as `a=1&b=2`.
    Form(Vec<(String, String)>),
}

impl RawBody {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RawBody::Bytes(bytes) => bytes.clone(),
            RawBody::Form(fields) => fields
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&")
                .into_bytes(),
        }
    }
}

impl From<Vec<u8>> for RawBody {
    fn from(bytes: Vec<u8>) -> Self {
        RawBody::Bytes(bytes)
    }
}

impl From<String> for RawBody {
    fn from(text: String) -> Self {
        RawBody::Bytes(text.into_bytes())
    }
}

impl From<&str> for RawBody {
    fn from(text: &str) -> Self {
        RawBody::Bytes(text.as_bytes().to_vec())
    }
}

/// Bearer-authenticated client for the Jobs API.
///
/// Cheap to share by reference across threads when `T` is.
#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    config: ClientConfig,
    transport: T,
}

#[cfg(feature = "ureq")]
impl ApiClient<crate::transport::UreqTransport> {
    /// Client backed by the blocking `ureq` transport.
    pub fn with_ureq(config: ClientConfig) -> Self {
        Self::new(config, crate::transport::UreqTransport::new())
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `base_url` + `path`, inserting the leading `/` when missing.
    ///
    /// Characters that may not appear in a URI (spaces, non-ASCII, stray `%`)
    /// are percent-encoded; everything already legal is left untouched.
    pub fn url_for(&self, path: &str) -> String {
        let path = requote(path);
        if path.starts_with('/') {
            format!("{}{path}", self.config.base_url())
        } else {
            format!("{}/{path}", self.config.base_url())
        }
    }

    /// Default headers with `extra` merged on top (case-insensitive keys,
    /// caller wins).
    pub fn headers_for(&self, extra: &[(String, String)]) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Authorization".to_string(), format!("Bearer {}", self.config.credential())),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        for (name, value) in extra {
            match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
                Some(entry) => *entry = (name.clone(), value.clone()),
                None => headers.push((name.clone(), value.clone())),
            }
        }
        headers
    }

    pub fn build_request(&self, method: &str, path: &str, options: &RequestOptions) -> Result<HttpRequest> {
        let method: HttpMethod = method.parse()?;
        let mut url = self.url_for(path);
        append_query(&mut url, &options.query);

        let body = match (&options.json_body, &options.raw_body) {
            (Some(json), _) => Some(serde_json::to_vec(json).map_err(Error::Serialization)?),
            (None, Some(raw)) => Some(raw.to_bytes()),
            (None, None) => None,
        };

        Ok(HttpRequest {
            method,
            url,
            headers: self.headers_for(&options.headers),
            body,
            timeout: options.timeout.unwrap_or(self.config.default_timeout()),
        })
    }

    /// Classify `response` and decode its body.
    ///
    /// 2xx: JSON when the content type says so, raw text otherwise.
    /// Anything else: `Error::Api` with the body parsed as JSON when possible.
    pub fn parse_response(&self, request: &HttpRequest, response: HttpResponse) -> Result<Payload> {
        if !response.is_success() {
            return Err(api_error(request, response).into());
        }
        if response.is_json() {
            return serde_json::from_str(&response.body)
                .map(Payload::Json)
                .map_err(Error::Decode);
        }
        Ok(Payload::Text(response.body))
    }

    /// Dispatch one request. No retries.
    pub fn request(&self, method: &str, path: &str, options: impl Into<RequestOptions>) -> Result<Payload> {
        let request = self.build_request(method, path, &options.into())?;
        tracing::info!("{} {}", request.method, request.url);
        let response = self.transport.send(&request)?;
        self.parse_response(&request, response)
    }

    pub fn get(&self, path: &str, options: GetOptions) -> Result<Payload> {
        self.request("GET", path, options)
    }

    pub fn post(&self, path: &str, options: PostOptions) -> Result<Payload> {
        self.request("POST", path, options)
    }

    /// `get` and deserialize the JSON payload into `R`.
    pub fn get_json<R: DeserializeOwned>(&self, path: &str, options: GetOptions) -> Result<R> {
        decode(self.get(path, options)?)
    }

    /// Serialize `body` as JSON, `post` it and deserialize the reply into `R`.
    pub fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(Error::Serialization)?;
        decode(self.post(path, PostOptions::new().json(body))?)
    }
}

fn decode<R: DeserializeOwned>(payload: Payload) -> Result<R> {
    match payload {
        Payload::Json(value) => serde_json::from_value(value).map_err(Error::Decode),
        Payload::Text(text) => serde_json::from_str(&text).map_err(Error::Decode),
    }
}

fn api_error(request: &HttpRequest, response: HttpResponse) -> ApiError {
    let status = response.status;
    let body = match serde_json::from_str::<Value>(&response.body) {
        Ok(value) => Payload::Json(value),
        Err(_) => Payload::Text(response.body),
    };
    let message = format!("{} | Response body: {body}", status_line(status, &request.url));
    tracing::debug!(status, url = %request.url, "request failed");
    ApiError { status, message, body }
}

/// `404 Client Error: Not Found for url: <url>`
fn status_line(status: u16, url: &str) -> String {
    let class = match status {
        400..=499 => "Client Error",
        500..=599 => "Server Error",
        _ => "Unexpected Status",
    };
    let reason = ::http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown");
    format!("{status} {class}: {reason} for url: {url}")
}

fn requote(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = String::with_capacity(path.len());
    for (i, ch) in path.char_indices() {
        let keep = match ch {
            '%' => bytes.len() > i + 2 && bytes[i + 1].is_ascii_hexdigit() && bytes[i + 2].is_ascii_hexdigit(),
            c if c.is_ascii_alphanumeric() => true,
            c => "-._~:/?#[]@!$&'()*+,;=".contains(c),
        };
        if keep {
            out.push(ch);
        } else {
            out.push_str(&urlencoding::encode(ch.encode_utf8(&mut [0; 4])));
        }
    }
    out
}

/// Append `query` to `url`, percent-encoding keys and values. `null` values
/// are skipped and arrays become repeated keys.
fn append_query(url: &mut String, query: &[(String, Value)]) {
    let mut pairs = Vec::new();
    for (name, value) in query {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(rendered) = render_query_value(item) {
                        pairs.push((name, rendered));
                    }
                }
            }
            other => {
                if let Some(rendered) = render_query_value(other) {
                    pairs.push((name, rendered));
                }
            }
        }
    }
    if pairs.is_empty() {
        return;
    }

    if !url.contains('?') {
        url.push('?');
    } else if !url.ends_with('?') && !url.ends_with('&') {
        url.push('&');
    }
    let encoded: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    url.push_str(&encoded.join("&"));
}

fn render_query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
