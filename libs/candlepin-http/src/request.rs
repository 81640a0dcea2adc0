use crate::builder::ConnectionService;
use crate::error::{HttpError, InvalidUriKind};
use crate::response::HttpResponse;
use bytes::Bytes;
use http::Request;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use http_body_util::Full;
use serde::Serialize;
use tower::{Service, ServiceExt};

/// Ordered query-string pairs.
///
/// Keys may repeat; every pair is sent in insertion order, which is how
/// list-valued parameters (`?pool=a&pool=b`) reach the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Builder-style [`push`](Self::push)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// Push `key=value` once per value
    pub fn push_all<I, V>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        for value in values {
            self.push(key, value);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// All values sent under `key`, in order
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `application/x-www-form-urlencoded` rendering of the pairs
    ///
    /// # Errors
    /// Returns `HttpError::QueryEncode` if encoding fails.
    pub fn encode(&self) -> Result<String, HttpError> {
        Ok(serde_urlencoded::to_string(&self.pairs)?)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// HTTP request builder with fluent API
///
/// Created by [`HttpClient::request`](crate::HttpClient::request) and the
/// per-method helpers. Errors found while building are deferred to
/// [`send()`](RequestBuilder::send).
#[must_use = "RequestBuilder does nothing until .send() is called"]
pub struct RequestBuilder {
    service: ConnectionService,
    max_body_size: usize,
    method: http::Method,
    url: String,
    query: Option<String>,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Option<Bytes>,
    error: Option<HttpError>,
    allow_http: bool,
}

impl RequestBuilder {
    pub(crate) fn new(
        service: ConnectionService,
        max_body_size: usize,
        method: http::Method,
        url: String,
        allow_http: bool,
    ) -> Self {
        Self {
            service,
            max_body_size,
            method,
            url,
            query: None,
            headers: Vec::new(),
            body: None,
            error: None,
            allow_http,
        }
    }

    /// Add a single header to the request
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            (Ok(name), Ok(value)) => self.headers.push((name, value)),
            (Err(e), _) => self.error = Some(HttpError::InvalidHeaderName(e)),
            (_, Err(e)) => self.error = Some(HttpError::InvalidHeaderValue(e)),
        }
        self
    }

    /// Request a specific media type instead of JSON
    pub fn accept(self, media_type: &str) -> Self {
        self.header(ACCEPT.as_str(), media_type)
    }

    /// Append the query string; an empty set adds nothing
    pub fn query(mut self, params: &QueryParams) -> Self {
        if self.error.is_some() || params.is_empty() {
            return self;
        }
        match params.encode() {
            Ok(encoded) => self.query = Some(encoded),
            Err(e) => self.error = Some(e),
        }
        self
    }

    /// Serialize `body` as the JSON request body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        if self.error.is_some() {
            return self;
        }
        match serde_json::to_vec(body) {
            Ok(bytes) => {
                self.body = Some(Bytes::from(bytes));
                if !self.headers.iter().any(|(name, _)| name == CONTENT_TYPE) {
                    self.headers
                        .push((CONTENT_TYPE, HeaderValue::from_static("application/json")));
                }
            }
            Err(e) => self.error = Some(HttpError::Json(e)),
        }
        self
    }

    /// The full URL this request will be sent to
    #[must_use]
    pub fn url(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{query}", self.url),
            None => self.url.clone(),
        }
    }

    fn validate_url(&self, url: &str) -> Result<http::Uri, HttpError> {
        let uri: http::Uri = url
            .parse()
            .map_err(|e: http::uri::InvalidUri| HttpError::InvalidUri {
                url: url.to_owned(),
                kind: InvalidUriKind::ParseError,
                reason: e.to_string(),
            })?;

        if uri.authority().is_none() {
            return Err(HttpError::InvalidUri {
                url: url.to_owned(),
                kind: InvalidUriKind::MissingAuthority,
                reason: "missing host/authority".to_owned(),
            });
        }

        match uri.scheme_str() {
            Some("https") => Ok(uri),
            Some("http") if self.allow_http => Ok(uri),
            Some("http") => Err(HttpError::InvalidScheme {
                scheme: "http".to_owned(),
                reason: "HTTPS required by the connection settings".to_owned(),
            }),
            Some(scheme) => Err(HttpError::InvalidScheme {
                scheme: scheme.to_owned(),
                reason: "only http:// and https:// schemes are supported".to_owned(),
            }),
            None => Err(HttpError::InvalidUri {
                url: url.to_owned(),
                kind: InvalidUriKind::MissingScheme,
                reason: "missing scheme".to_owned(),
            }),
        }
    }

    /// Send the request and return the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `HttpError` if building the request failed (invalid header,
    /// URL or body) or the exchange failed below HTTP (refused, timed out,
    /// TLS). A 4xx/5xx status is an `Ok` response.
    pub async fn send(mut self) -> Result<HttpResponse, HttpError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }

        let url = self.url();
        let uri = self.validate_url(&url)?;

        let mut builder = Request::builder().method(self.method.clone()).uri(uri);
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        let request = builder.body(Full::new(self.body.unwrap_or_default()))?;

        let inner = self.service.ready().await?.call(request).await?;

        tracing::debug!(
            method = %self.method,
            url = %url,
            status = inner.status().as_u16(),
            "candlepin request completed"
        );

        Ok(HttpResponse {
            inner,
            max_body_size: self.max_body_size,
        })
    }
}
