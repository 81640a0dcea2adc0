#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Authenticated HTTP transport for the Candlepin REST client
//!
//! This crate turns a [`TransportConfig`] into a ready [`HttpClient`]:
//! - TLS via rustls, with optional server-certificate verification
//! - Exactly one authentication mode per connection: none, pre-emptive
//!   HTTP Basic, or a client certificate presented during the handshake
//! - Connection pooling and a configurable connect timeout
//! - `User-Agent` and `Accept: application/json` on every request
//! - Transparent response decompression (gzip, brotli, deflate)
//! - Content negotiation of response bodies ([`NegotiatedBody`])
//!
//! # Example
//!
//! ```ignore
//! use candlepin_http::{BasicCredentials, ConnectionSettings, HttpClient, TransportConfig};
//!
//! let settings = ConnectionSettings::load(None)?;
//! let transport = TransportConfig::basic_auth(settings, BasicCredentials::default());
//! let client = HttpClient::from_transport(&transport)?;
//!
//! let status = client.get("/status").send().await?.negotiate().await?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod layers;
mod request;
mod response;
mod tls;

pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{
    AuthMode, BasicCredentials, ClientIdentity, ConnectionSettings, Credentials,
    DEFAULT_PASSWORD, DEFAULT_USER_AGENT, DEFAULT_USERNAME, ENV_PREFIX, Password,
    TransportConfig,
};
pub use error::{HttpError, InvalidUriKind};
pub use http::{Method, StatusCode};
pub use layers::{
    BasicAuthLayer, BasicAuthService, DEFAULT_ACCEPT, DefaultHeadersLayer, DefaultHeadersService,
};
pub use request::{QueryParams, RequestBuilder};
pub use response::{HttpResponse, NegotiatedBody, ResponseBody, is_json_content_type};
pub use tls::{CertificateMaterial, PrivateKeyMaterial, client_tls_config};
