use base64::Engine;
use base64::engine::general_purpose;
use http::header::AUTHORIZATION;
use http::{HeaderValue, Request, Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use zeroize::Zeroizing;

use crate::config::BasicCredentials;
use crate::error::HttpError;

/// Tower layer that attaches `Authorization: Basic …` to every request
/// up front instead of waiting for a challenge.
///
/// The header value is computed once, when the connection is built, and
/// marked sensitive so it is redacted from debug output.
#[derive(Clone)]
pub struct BasicAuthLayer {
    header: HeaderValue,
}

impl BasicAuthLayer {
    /// Encode the credentials into a header value.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if the encoded value is not a
    /// valid header (only possible for pathological inputs).
    pub fn try_new(credentials: &BasicCredentials) -> Result<Self, HttpError> {
        let plain = Zeroizing::new(format!(
            "{}:{}",
            credentials.username,
            credentials.password.expose()
        ));
        let encoded = Zeroizing::new(general_purpose::STANDARD.encode(plain.as_bytes()));
        let raw = Zeroizing::new(format!("Basic {}", &*encoded));

        let mut header = HeaderValue::from_str(&raw)?;
        header.set_sensitive(true);
        Ok(Self { header })
    }
}

impl<S> Layer<S> for BasicAuthLayer {
    type Service = BasicAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BasicAuthService {
            inner,
            header: self.header.clone(),
        }
    }
}

/// Service created by [`BasicAuthLayer`].
#[derive(Clone)]
pub struct BasicAuthService<S> {
    inner: S,
    header: HeaderValue,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for BasicAuthService<S>
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
        req.headers_mut().insert(AUTHORIZATION, self.header.clone());
        self.inner.call(req)
    }
}

impl std::fmt::Debug for BasicAuthLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthLayer")
            .field("header", &"[REDACTED]")
            .finish()
    }
}
