//! Invocation contract shared by every resource trait.
//!
//! Resource operations only build [`WireRequest`]s; an [`Api`]
//! implementation sends them. This keeps the per-endpoint traits free of
//! transport concerns and lets them be exercised against a recording fake.

use async_trait::async_trait;
use bytes::Bytes;
use candlepin_http::{Method, QueryParams, StatusCode};
use serde_json::Value;

pub use candlepin_http::NegotiatedBody as Content;

use crate::error::{ClientError, ClientResult};
use crate::options::{DefaultSet, OptionSet, merge, validate_required};

/// Media type requested by [`Api::get_text`]
pub const TEXT_PLAIN: &str = "text/plain";
/// Media type requested by [`Api::get_file`]
pub const APPLICATION_ZIP: &str = "application/zip";

/// One fully shaped request: path below the base URL, ordered query pairs
/// and an optional JSON body in wire convention.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub method: Method,
    pub path: String,
    pub query: QueryParams,
    pub body: Option<Value>,
    /// Overrides `Accept: application/json`. The response is then returned
    /// undecoded.
    pub accept: Option<&'static str>,
}

impl WireRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            body: None,
            accept: None,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_accept(mut self, media_type: &'static str) -> Self {
        self.accept = Some(media_type);
        self
    }
}

/// Status and decoded body of a completed exchange.
///
/// Any HTTP status is a valid `ApiResponse`; use [`ok_content`](Self::ok_content)
/// when only a success is acceptable.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub content: Content,
}

impl ApiResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The decoded JSON body, if the response carried one
    #[must_use]
    pub fn json(&self) -> Option<&Value> {
        match &self.content {
            Content::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The text body, if the response was text
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The content of a 2xx response as a JSON value: parsed JSON, text as
    /// a string, an empty body as null.
    ///
    /// # Errors
    /// `UnexpectedStatus` for any other status, `Decode` for a binary body.
    pub fn ok_content(self) -> ClientResult<Value> {
        let status = self.status;
        match self.ok()? {
            Content::Json(value) => Ok(value),
            Content::Text(text) => Ok(Value::String(text)),
            Content::Empty => Ok(Value::Null),
            Content::Binary(bytes) => Err(ClientError::Decode(format!(
                "expected JSON or text, got {} bytes of binary content (status {status})",
                bytes.len()
            ))),
        }
    }

    /// Like [`ok_content`](Self::ok_content) but requires a JSON body.
    ///
    /// # Errors
    /// `UnexpectedStatus` for a non-2xx status, `Decode` for a non-JSON body.
    pub fn ok_json(self) -> ClientResult<Value> {
        match self.ok()? {
            Content::Json(value) => Ok(value),
            other => Err(ClientError::Decode(format!("expected JSON body, got {other:?}"))),
        }
    }

    /// The raw content of a 2xx response.
    ///
    /// # Errors
    /// `UnexpectedStatus` for a non-2xx status.
    pub fn ok(self) -> ClientResult<Content> {
        if self.is_success() {
            return Ok(self.content);
        }
        let body = match self.content {
            Content::Json(value) => value.to_string(),
            Content::Text(text) => text,
            Content::Binary(bytes) => format!("<{} bytes>", bytes.len()),
            Content::Empty => String::new(),
        };
        Err(ClientError::UnexpectedStatus {
            status: self.status,
            body,
        })
    }
}

/// Content of a response fetched with an explicit `Accept`: text when it is
/// UTF-8, bytes otherwise.
#[must_use]
pub fn raw_content(bytes: Bytes) -> Content {
    if bytes.is_empty() {
        return Content::Empty;
    }
    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => Content::Text(text),
        Err(_) => Content::Binary(bytes),
    }
}

/// Sends shaped requests; implemented by
/// [`CandlepinClient`](crate::CandlepinClient).
///
/// Every resource trait has this as its supertrait and builds on the
/// generic helpers provided here.
#[async_trait]
pub trait Api: Send + Sync {
    /// The consumer uuid used when an operation's `uuid` is not supplied
    fn sticky_uuid(&self) -> Option<String>;

    /// Send `request` and decode the response.
    ///
    /// JSON bodies come back with keys in the caller convention.
    async fn execute(&self, request: WireRequest) -> ClientResult<ApiResponse>;

    /// [`sticky_uuid`](Self::sticky_uuid) as a default value
    fn uuid_default(&self) -> Value {
        self.sticky_uuid().map_or(Value::Null, Value::String)
    }

    /// GET `path` as `text/plain`
    async fn get_text(&self, path: &str) -> ClientResult<ApiResponse> {
        self.get_type(TEXT_PLAIN, path).await
    }

    /// GET `path` as `application/zip`
    async fn get_file(&self, path: &str) -> ClientResult<ApiResponse> {
        self.get_type(APPLICATION_ZIP, path).await
    }

    /// GET `path` with the given `Accept` media type
    async fn get_type(&self, media_type: &'static str, path: &str) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get(path).with_accept(media_type))
            .await
    }

    /// GET `{resource}/{opts[key]}`; `key` is the only accepted option and
    /// is required.
    async fn get_by_id(&self, resource: &str, key: &str, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param(key, Value::Null))?;
        validate_required(&opts, &[])?;
        let path = format!("{resource}/{}", opts.segment(key)?);
        self.execute(WireRequest::get(path)).await
    }

    /// DELETE `{resource}/{opts[key]}`; `key` is the only accepted option
    /// and is required.
    async fn delete_by_id(
        &self,
        resource: &str,
        key: &str,
        opts: OptionSet,
    ) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param(key, Value::Null))?;
        validate_required(&opts, &[])?;
        let path = format!("{resource}/{}", opts.segment(key)?);
        self.execute(WireRequest::delete(path)).await
    }
}
