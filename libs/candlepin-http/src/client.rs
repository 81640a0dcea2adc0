use crate::builder::{ConnectionService, HttpClientBuilder};
use crate::config::TransportConfig;
use crate::error::HttpError;
use crate::request::RequestBuilder;
use std::fmt;

/// An authenticated connection to one Candlepin server.
///
/// Cheap to clone; clones share the underlying connection pool. The
/// authentication mode is fixed at build time, so changing credentials
/// means building a new client from an updated [`TransportConfig`].
#[derive(Clone)]
pub struct HttpClient {
    pub(crate) service: ConnectionService,
    pub(crate) base_url: String,
    pub(crate) max_body_size: usize,
    pub(crate) allow_http: bool,
}

impl HttpClient {
    /// Shorthand for [`HttpClientBuilder::from_transport`].
    ///
    /// # Errors
    /// See [`HttpClientBuilder::from_transport`].
    pub fn from_transport(transport: &TransportConfig) -> Result<Self, HttpError> {
        HttpClientBuilder::from_transport(transport)
    }

    /// Base URL the connection was built for, e.g. `https://localhost:8443/candlepin`
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a request against `path` below the base URL.
    ///
    /// The leading `/` of `path` is optional.
    pub fn request(&self, method: http::Method, path: &str) -> RequestBuilder {
        RequestBuilder::new(
            self.service.clone(),
            self.max_body_size,
            method,
            join_url(&self.base_url, path),
            self.allow_http,
        )
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(http::Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(http::Method::POST, path)
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.request(http::Method::PUT, path)
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.request(http::Method::DELETE, path)
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::{BasicCredentials, ConnectionSettings};
    use crate::request::QueryParams;
    use crate::response::NegotiatedBody;
    use httpmock::prelude::*;

    fn plain_settings(server: &MockServer) -> ConnectionSettings {
        ConnectionSettings::default()
            .with_host(server.host())
            .with_port(server.port())
            .with_tls(false)
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h:1/candlepin", "/status"), "http://h:1/candlepin/status");
        assert_eq!(join_url("http://h:1/candlepin/", "status"), "http://h:1/candlepin/status");
    }

    #[tokio::test]
    async fn test_basic_auth_sent_preemptively() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/candlepin/status")
                    .header("authorization", "Basic YWRtaW46YWRtaW4=")
                    .header("accept", "application/json");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(serde_json::json!({"result": true}));
            })
            .await;

        let transport =
            TransportConfig::basic_auth(plain_settings(&server), BasicCredentials::default());
        let client = HttpClient::from_transport(&transport).unwrap();
        let response = client.get("/status").send().await.unwrap();

        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(
            response.negotiate().await.unwrap(),
            NegotiatedBody::Json(serde_json::json!({"result": true}))
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_auth_sends_no_authorization() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/candlepin/status")
                    .header_missing("authorization");
                then.status(200);
            })
            .await;

        let client =
            HttpClient::from_transport(&TransportConfig::no_auth(plain_settings(&server))).unwrap();
        client.get("status").send().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_not_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.path("/candlepin/owners");
                then.status(401)
                    .header("content-type", "application/json")
                    .body(r#"{"displayMessage":"Invalid credentials"}"#);
            })
            .await;

        let client =
            HttpClient::from_transport(&TransportConfig::no_auth(plain_settings(&server))).unwrap();
        let response = client.get("/owners").send().await.unwrap();
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_query_and_json_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/candlepin/consumers")
                    .query_param("owner", "admin")
                    .query_param("activation_keys", "k1,k2")
                    .header("content-type", "application/json")
                    .json_body(serde_json::json!({"name": "box"}));
                then.status(200).body("{}");
            })
            .await;

        let client =
            HttpClient::from_transport(&TransportConfig::no_auth(plain_settings(&server))).unwrap();
        let query = QueryParams::new()
            .with("owner", "admin")
            .with("activation_keys", "k1,k2");
        client
            .post("/consumers")
            .query(&query)
            .json(&serde_json::json!({"name": "box"}))
            .send()
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_accept_override() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.path("/candlepin/consumers/abc/export")
                    .header("accept", "application/zip");
                then.status(200).body("PK");
            })
            .await;

        let client =
            HttpClient::from_transport(&TransportConfig::no_auth(plain_settings(&server))).unwrap();
        client
            .get("/consumers/abc/export")
            .accept("application/zip")
            .send()
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_rejected_when_tls_required() {
        let settings = ConnectionSettings::default().with_host("127.0.0.1");
        let mut client = HttpClient::from_transport(&TransportConfig::no_auth(settings)).unwrap();
        client.base_url = "http://127.0.0.1:8443/candlepin".to_owned();

        let err = client.get("/status").send().await.unwrap_err();
        assert!(matches!(err, HttpError::InvalidScheme { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let settings = ConnectionSettings::default()
            .with_host("127.0.0.1")
            .with_port(1)
            .with_tls(false);
        let client = HttpClient::from_transport(&TransportConfig::no_auth(settings)).unwrap();

        let err = client.get("/status").send().await.unwrap_err();
        assert!(
            matches!(err, HttpError::Transport(_) | HttpError::Timeout(_)),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_gzip_response_is_decompressed() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"{"compressed":true}"#).unwrap();
        let gzipped = encoder.finish().unwrap();

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.path("/candlepin/status");
                then.status(200)
                    .header("content-type", "application/json")
                    .header("content-encoding", "gzip")
                    .body(gzipped);
            })
            .await;

        let client =
            HttpClient::from_transport(&TransportConfig::no_auth(plain_settings(&server))).unwrap();
        let body = client.get("/status").send().await.unwrap().negotiate().await.unwrap();
        assert_eq!(body, NegotiatedBody::Json(serde_json::json!({"compressed": true})));
    }
}
