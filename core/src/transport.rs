//! The transport collaborator: executes one `HttpRequest` and hands back the
//! `HttpResponse` as data.
//!
//! # Design
//! A transport returns 4xx/5xx responses as `Ok(HttpResponse)` so status
//! interpretation stays in the dispatcher. `Err` is reserved for "no response
//! at all", and timeouts must come back as `TransportError::Timeout`.
//!
//! `ApiClient` may be shared across threads, so implementations are
//! `Send + Sync`.

use std::sync::Arc;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes a single HTTP round-trip.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

#[cfg(feature = "ureq")]
pub use self::blocking::UreqTransport;

#[cfg(feature = "ureq")]
mod blocking {
    use std::io;

    use super::Transport;
    use crate::error::TransportError;
    use crate::http::{HttpRequest, HttpResponse};

    /// Blocking transport on `ureq`.
    ///
    /// One agent (and its connection pool) is shared by every call. Status
    /// codes are returned as data, non-standard methods are allowed, response
    /// bodies are read without a size cap, and `HttpRequest::timeout` becomes
    /// the global timeout of each individual request.
    #[derive(Debug, Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        pub fn new() -> Self {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .allow_non_standard_methods(true)
                .build()
                .new_agent();
            Self { agent }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for UreqTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            let mut builder = ureq::http::Request::builder()
                .method(request.method.as_str())
                .uri(request.url.as_str());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let sent = match &request.body {
                Some(body) => {
                    let req = builder.body(body.clone()).map_err(|e| TransportError::Other(e.to_string()))?;
                    let req = self
                        .agent
                        .configure_request(req)
                        .timeout_global(Some(request.timeout))
                        .build();
                    self.agent.run(req)
                }
                None => {
                    let req = builder.body(()).map_err(|e| TransportError::Other(e.to_string()))?;
                    let req = self
                        .agent
                        .configure_request(req)
                        .timeout_global(Some(request.timeout))
                        .build();
                    self.agent.run(req)
                }
            };
            let mut response = sent.map_err(from_ureq)?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let bytes = response
                .body_mut()
                .with_config()
                .limit(u64::MAX)
                .read_to_vec()
                .map_err(from_ureq)?;

            Ok(HttpResponse {
                status,
                headers,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            })
        }
    }

    fn from_ureq(err: ureq::Error) -> TransportError {
        match err {
            ureq::Error::Timeout(_) => TransportError::Timeout,
            ureq::Error::HostNotFound => TransportError::HostNotFound(err.to_string()),
            ureq::Error::ConnectionFailed => TransportError::Connect(err.to_string()),
            ureq::Error::Io(io_err) => match io_err.kind() {
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout,
                io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => {
                    TransportError::Connect(io_err.to_string())
                }
                _ => TransportError::Io(io_err.to_string()),
            },
            other => TransportError::Other(other.to_string()),
        }
    }
}
