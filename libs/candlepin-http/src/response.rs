use crate::error::HttpError;
use bytes::Bytes;
use http::{HeaderMap, Response, StatusCode};
use http_body_util::BodyExt;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

/// Type alias for the boxed response body that supports decompression.
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

static JSON_CONTENT_TYPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(application|text)/(x-)?json").ok());

/// Whether a `Content-Type` value announces JSON.
#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    JSON_CONTENT_TYPE
        .as_ref()
        .is_some_and(|re| re.is_match(content_type))
}

/// Response body after content negotiation.
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiatedBody {
    /// JSON content type with a non-empty body
    Json(serde_json::Value),
    /// Any other UTF-8 body
    Text(String),
    /// Body that is not valid UTF-8 (archives, certificates in DER, ...)
    Binary(Bytes),
    /// Zero-length body
    Empty,
}

/// HTTP response wrapper with body-reading helpers
///
/// All body reads enforce the configured `max_body_size` limit. Status
/// codes are not interpreted here.
#[derive(Debug)]
pub struct HttpResponse {
    pub(crate) inner: Response<ResponseBody>,
    pub(crate) max_body_size: usize,
}

impl HttpResponse {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// The `Content-Type` header, when present and readable
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.inner
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Read the whole body.
    ///
    /// # Errors
    /// Returns `HttpError::BodyTooLarge` past `max_body_size` and
    /// `HttpError::Transport` if the stream fails.
    pub async fn bytes(self) -> Result<Bytes, HttpError> {
        read_body_limited_impl(self.inner, self.max_body_size).await
    }

    /// Read the body as UTF-8, replacing invalid sequences.
    ///
    /// # Errors
    /// Same as [`bytes`](Self::bytes).
    pub async fn text(self) -> Result<String, HttpError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Parse the body as JSON regardless of the announced content type.
    ///
    /// # Errors
    /// Returns `HttpError::Json` if the body is not valid JSON for `T`.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read the body and decode it according to its content type.
    ///
    /// # Errors
    /// Returns `HttpError::Json` when a JSON-typed body does not parse, plus
    /// the errors of [`bytes`](Self::bytes).
    pub async fn negotiate(self) -> Result<NegotiatedBody, HttpError> {
        let json = self.content_type().is_some_and(is_json_content_type);
        let bytes = self.bytes().await?;
        negotiate_bytes(json, bytes)
    }

    /// Consume and return the underlying `http::Response`
    #[must_use]
    pub fn into_inner(self) -> Response<ResponseBody> {
        self.inner
    }
}

fn negotiate_bytes(json: bool, bytes: Bytes) -> Result<NegotiatedBody, HttpError> {
    if bytes.is_empty() {
        return Ok(NegotiatedBody::Empty);
    }
    if json {
        return Ok(NegotiatedBody::Json(serde_json::from_slice(&bytes)?));
    }
    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => Ok(NegotiatedBody::Text(text)),
        Err(_) => Ok(NegotiatedBody::Binary(bytes)),
    }
}

/// Read a response body, failing once more than `limit` decompressed
/// bytes have arrived.
///
/// # Errors
/// Returns `HttpError::BodyTooLarge` or `HttpError::Transport`.
pub async fn read_body_limited_impl(
    response: Response<ResponseBody>,
    limit: usize,
) -> Result<Bytes, HttpError> {
    let (_parts, body) = response.into_parts();

    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(HttpError::Transport)?;
        if let Some(chunk) = frame.data_ref() {
            if collected.len() + chunk.len() > limit {
                return Err(HttpError::BodyTooLarge {
                    limit,
                    actual: collected.len() + chunk.len(),
                });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Bytes::from(collected))
}
