use crate::error::HttpError;
use http::header::{ACCEPT, HeaderName, USER_AGENT};
use http::{HeaderValue, Request, Response};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Media type requested unless a call asks for something else
pub const DEFAULT_ACCEPT: &str = "application/json";

/// Tower layer that fills in headers every request should carry
/// (User-Agent, Accept) without overriding values set per request.
#[derive(Clone)]
pub struct DefaultHeadersLayer {
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl DefaultHeadersLayer {
    /// Create a layer sending the given User-Agent and `Accept: application/json`
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if the user agent string is not valid
    pub fn try_new(user_agent: impl AsRef<str>) -> Result<Self, HttpError> {
        let user_agent =
            HeaderValue::from_str(user_agent.as_ref()).map_err(HttpError::InvalidHeaderValue)?;
        Ok(Self {
            headers: Arc::from(vec![
                (USER_AGENT, user_agent),
                (ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT)),
            ]),
        })
    }
}

impl<S> Layer<S> for DefaultHeadersLayer {
    type Service = DefaultHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DefaultHeadersService {
            inner,
            headers: Arc::clone(&self.headers),
        }
    }
}

/// Service that adds default headers to requests
#[derive(Clone)]
pub struct DefaultHeadersService<S> {
    inner: S,
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for DefaultHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        for (name, value) in &*self.headers {
            if !req.headers().contains_key(name) {
                req.headers_mut().insert(name.clone(), value.clone());
            }
        }
        self.inner.call(req)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use http_body_util::Full;
    use tower::ServiceExt;

    /// Test service that asserts the headers match the expected values.
    #[derive(Clone)]
    struct CheckHeadersService {
        expected_ua: HeaderValue,
        expected_accept: HeaderValue,
    }

    impl Service<Request<Full<Bytes>>> for CheckHeadersService {
        type Response = Response<Full<Bytes>>;
        type Error = Box<dyn std::error::Error + Send + Sync>;
        type Future = std::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
            assert_eq!(req.headers().get(USER_AGENT), Some(&self.expected_ua));
            assert_eq!(req.headers().get(ACCEPT), Some(&self.expected_accept));
            std::future::ready(Ok(Response::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::new()))
                .unwrap()))
        }
    }

    #[tokio::test]
    async fn test_default_headers_added() {
        let check = CheckHeadersService {
            expected_ua: HeaderValue::from_static("candlepin-test/1.0"),
            expected_accept: HeaderValue::from_static("application/json"),
        };

        let mut service = DefaultHeadersLayer::try_new("candlepin-test/1.0")
            .unwrap()
            .layer(check);

        let req = Request::builder()
            .method(Method::GET)
            .uri("http://example.com")
            .body(Full::new(Bytes::new()))
            .unwrap();

        service.ready().await.unwrap().call(req).await.unwrap();
    }

    #[tokio::test]
    async fn test_explicit_accept_not_overwritten() {
        let check = CheckHeadersService {
            expected_ua: HeaderValue::from_static("candlepin-test/1.0"),
            expected_accept: HeaderValue::from_static("text/plain"),
        };

        let mut service = DefaultHeadersLayer::try_new("candlepin-test/1.0")
            .unwrap()
            .layer(check);

        let req = Request::builder()
            .method(Method::GET)
            .uri("http://example.com")
            .header(ACCEPT, "text/plain")
            .body(Full::new(Bytes::new()))
            .unwrap();

        service.ready().await.unwrap().call(req).await.unwrap();
    }

    #[test]
    fn test_invalid_user_agent_rejected() {
        let result = DefaultHeadersLayer::try_new("invalid\x00agent");
        assert!(result.is_err());
    }
}
