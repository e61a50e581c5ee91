//! Authenticated request helper for the Jobs API.
//!
//! # Overview
//! `ApiClient` composes a base URL, a bearer credential, default headers and
//! a default timeout into `get`, `post` and a generic `request`. Non-2xx
//! responses become `Error::Api` carrying the parsed (or raw) response body.
//!
//! # Design
//! - Request building and response parsing are pure (`build_request` /
//!   `parse_response`); the network round-trip goes through the `Transport`
//!   trait, so the core is deterministic and testable without sockets.
//! - `UreqTransport` (feature `ureq`, on by default) is the stock blocking
//!   transport.
//! - There is no global client: callers construct and pass an `ApiClient`.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;

pub use client::{ApiClient, GetOptions, PostOptions, RawBody, RequestOptions};
pub use config::{ClientConfig, DEFAULT_TIMEOUT_MS};
pub use error::{ApiError, Error, Result, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Payload};
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
