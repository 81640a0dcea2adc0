use crate::config::{Credentials, TransportConfig};
use crate::error::HttpError;
use crate::layers::{BasicAuthLayer, DefaultHeadersLayer};
use crate::response::ResponseBody;
use crate::tls;
use bytes::Bytes;
use http::Response;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::error::Error as StdError;
use std::time::Duration;
use tower::util::BoxCloneSyncService;
use tower::{Layer, ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;

/// Type-erased service shared by every request of one connection.
pub(crate) type ConnectionService =
    BoxCloneSyncService<http::Request<Full<Bytes>>, Response<ResponseBody>, HttpError>;

/// Builds an [`HttpClient`](crate::HttpClient) from a [`TransportConfig`].
///
/// The config is only read. Building twice from the same value yields two
/// independent connections with identical behavior.
pub struct HttpClientBuilder;

impl HttpClientBuilder {
    /// Build a connection for the transport's single authentication mode.
    ///
    /// # Errors
    ///
    /// - `HttpError::Configuration` if a client-certificate transport lacks
    ///   its certificate or private key (all missing fields are named)
    /// - `HttpError::Tls` / `HttpError::Certificate` if the TLS configuration
    ///   cannot be assembled
    /// - `HttpError::InvalidHeaderValue` for an unusable User-Agent or
    ///   credential
    pub fn from_transport(transport: &TransportConfig) -> Result<crate::HttpClient, HttpError> {
        let settings = &transport.settings;

        let client_auth = match &transport.credentials {
            Credentials::ClientCertificate(identity) => Some(identity.require()?),
            Credentials::None | Credentials::Basic(_) => None,
        };

        if !settings.use_tls {
            tracing::warn!(
                host = %settings.host,
                "plain HTTP enabled; credentials are sent unencrypted"
            );
        }

        let tls_config = tls::client_tls_config(settings, client_auth)?;
        let https = build_https_connector(tls_config, settings.timeout, settings.use_tls);

        let mut client_builder = Client::builder(TokioExecutor::new());
        // pool_timer is required for the idle timeout to take effect
        client_builder
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .http2_only(false);
        let hyper_client = client_builder.build::<_, Full<Bytes>>(https);

        // Layer stack (outer → inner):
        //   DefaultHeaders → [BasicAuth] → ErrorMapping → Decompression → hyper_client
        //
        // send() returns Ok(Response) for every HTTP status. Only connection
        // level failures (refused, timed out, TLS) surface as Err.
        let timeout = settings.timeout;
        let service = ServiceBuilder::new()
            .layer(DecompressionLayer::new())
            .service(hyper_client)
            .map_response(map_decompression_response)
            .map_err(move |e: hyper_util::client::legacy::Error| map_transport_error(e, timeout));
        let mut service: ConnectionService = BoxCloneSyncService::new(service);

        if let Credentials::Basic(credentials) = &transport.credentials {
            let auth = BasicAuthLayer::try_new(credentials)?;
            service = BoxCloneSyncService::new(auth.layer(service));
        }

        let headers = DefaultHeadersLayer::try_new(&settings.user_agent)?;
        let service = BoxCloneSyncService::new(headers.layer(service));

        tracing::debug!(
            base_url = %settings.base_url(),
            auth_mode = ?transport.auth_mode(),
            "built candlepin connection"
        );

        Ok(crate::HttpClient {
            service,
            base_url: settings.base_url(),
            max_body_size: settings.max_body_size,
            allow_http: !settings.use_tls,
        })
    }
}

/// What a failed exchange means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Timeout,
    Tls,
    Transport,
}

/// Walk the source chain looking for a timed-out socket or a rustls error.
fn classify_failure(err: &(dyn StdError + 'static)) -> FailureKind {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<rustls::Error>().is_some() {
            return FailureKind::Tls;
        }
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return FailureKind::Timeout;
            }
            if io
                .get_ref()
                .is_some_and(|inner| inner.downcast_ref::<rustls::Error>().is_some())
            {
                return FailureKind::Tls;
            }
        }
        current = e.source();
    }
    FailureKind::Transport
}

/// Map hyper client failures to `HttpError` with the configured timeout
fn map_transport_error(err: hyper_util::client::legacy::Error, timeout: Duration) -> HttpError {
    match classify_failure(&err) {
        FailureKind::Timeout => HttpError::Timeout(timeout),
        FailureKind::Tls => HttpError::Tls(Box::new(err)),
        FailureKind::Transport => HttpError::Transport(Box::new(err)),
    }
}

/// Map the decompression response to our boxed response body type.
fn map_decompression_response<B>(response: Response<B>) -> Response<ResponseBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let (parts, body) = response.into_parts();
    let boxed_body: ResponseBody = body.map_err(Into::into).boxed();
    Response::from_parts(parts, boxed_body)
}

/// HTTPS connector over the given rustls config.
///
/// Plain `http://` is accepted only when the settings turn TLS off. ALPN
/// advertises both h2 and http/1.1.
fn build_https_connector(
    tls_config: rustls::ClientConfig,
    connect_timeout: Duration,
    use_tls: bool,
) -> HttpsConnector<HttpConnector> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(connect_timeout));

    let builder = hyper_rustls::HttpsConnectorBuilder::new().with_tls_config(tls_config);
    if use_tls {
        builder.https_only().enable_all_versions().wrap_connector(http)
    } else {
        builder
            .https_or_http()
            .enable_all_versions()
            .wrap_connector(http)
    }
}
