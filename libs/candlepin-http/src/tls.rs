//! TLS material and rustls configuration for the Candlepin connection.
//!
//! Native root certificates are loaded once per process and cached, since
//! a client rebuilds its connection every time its configuration changes.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use rustls::DigitallySignedStruct;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};

use crate::config::ConnectionSettings;
use crate::error::HttpError;

/// A certificate chain (leaf first) in DER form.
#[derive(Debug, Clone)]
pub struct CertificateMaterial {
    chain: Vec<CertificateDer<'static>>,
}

impl CertificateMaterial {
    /// Parse every `CERTIFICATE` block from PEM bytes.
    ///
    /// # Errors
    /// Returns `HttpError::Certificate` if the input holds no certificate or
    /// a block is malformed.
    pub fn from_pem(pem: impl AsRef<[u8]>) -> Result<Self, HttpError> {
        let chain = CertificateDer::pem_slice_iter(pem.as_ref())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| HttpError::Certificate(format!("invalid certificate PEM: {e}")))?;
        if chain.is_empty() {
            return Err(HttpError::Certificate(
                "no certificate found in PEM input".to_owned(),
            ));
        }
        Ok(Self { chain })
    }

    /// Read and parse a PEM certificate file.
    ///
    /// # Errors
    /// Returns `HttpError::Certificate` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, HttpError> {
        let bytes = std::fs::read(path).map_err(|e| {
            HttpError::Certificate(format!("cannot read certificate {}: {e}", path.display()))
        })?;
        Self::from_pem(bytes)
    }

    #[must_use]
    pub fn from_der(chain: Vec<CertificateDer<'static>>) -> Self {
        Self { chain }
    }

    #[must_use]
    pub fn chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }
}

/// A private key (PKCS#1, PKCS#8 or SEC1) in DER form.
pub struct PrivateKeyMaterial {
    key: PrivateKeyDer<'static>,
}

impl PrivateKeyMaterial {
    /// Parse the first private key block from PEM bytes.
    ///
    /// # Errors
    /// Returns `HttpError::Certificate` if no supported key is present.
    pub fn from_pem(pem: impl AsRef<[u8]>) -> Result<Self, HttpError> {
        let key = PrivateKeyDer::from_pem_slice(pem.as_ref())
            .map_err(|e| HttpError::Certificate(format!("invalid private key PEM: {e}")))?;
        Ok(Self { key })
    }

    /// Read and parse a PEM private key file.
    ///
    /// # Errors
    /// Returns `HttpError::Certificate` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, HttpError> {
        let bytes = std::fs::read(path).map_err(|e| {
            HttpError::Certificate(format!("cannot read private key {}: {e}", path.display()))
        })?;
        Self::from_pem(bytes)
    }

    #[must_use]
    pub fn from_der(key: PrivateKeyDer<'static>) -> Self {
        Self { key }
    }

    #[must_use]
    pub fn key(&self) -> &PrivateKeyDer<'static> {
        &self.key
    }
}

impl Clone for PrivateKeyMaterial {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone_key(),
        }
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyMaterial")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Cached native root certificates. Empty means none were found.
static NATIVE_ROOTS_CACHE: OnceLock<Vec<CertificateDer<'static>>> = OnceLock::new();

fn load_native_certs_inner() -> Vec<CertificateDer<'static>> {
    let result = rustls_native_certs::load_native_certs();

    for err in &result.errors {
        tracing::warn!(error = %err, "error loading native root certificate");
    }

    if result.certs.is_empty() {
        tracing::warn!("no native root CA certificates found");
    } else {
        tracing::debug!(count = result.certs.len(), "loaded native root certificates");
    }

    result.certs
}

/// Native root certificates, loaded on first use.
pub fn native_root_certs() -> &'static [CertificateDer<'static>] {
    NATIVE_ROOTS_CACHE
        .get_or_init(load_native_certs_inner)
        .as_slice()
}

/// Crypto provider for TLS connections.
///
/// Uses the process-wide default if one is installed, otherwise an
/// aws-lc-rs provider that is not installed globally.
pub fn get_crypto_provider() -> Arc<CryptoProvider> {
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// Build the rustls client configuration for the given settings.
///
/// - `skip_cert_verification` accepts any server certificate.
/// - Otherwise the native roots plus the certificates in `trusted_ca_path`
///   are trusted; having neither is an error.
/// - `client_auth` presents the given certificate and key to the server.
///
/// # Errors
/// Returns `HttpError::Tls` if the trust store is empty or rustls rejects
/// the client identity, and `HttpError::Certificate` if the CA file cannot
/// be loaded.
pub fn client_tls_config(
    settings: &ConnectionSettings,
    client_auth: Option<(&CertificateMaterial, &PrivateKeyMaterial)>,
) -> Result<rustls::ClientConfig, HttpError> {
    let provider = get_crypto_provider();

    let builder = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| HttpError::Tls(Box::new(e)))?;

    let builder = if settings.skip_cert_verification {
        tracing::warn!(
            host = %settings.host,
            "server certificate verification disabled"
        );
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification { provider }))
    } else {
        builder.with_root_certificates(trusted_roots(settings)?)
    };

    match client_auth {
        Some((cert, key)) => builder
            .with_client_auth_cert(cert.chain().to_vec(), key.key().clone_key())
            .map_err(|e| HttpError::Tls(Box::new(e))),
        None => Ok(builder.with_no_client_auth()),
    }
}

fn trusted_roots(settings: &ConnectionSettings) -> Result<rustls::RootCertStore, HttpError> {
    let mut roots = rustls::RootCertStore::empty();

    let (added, ignored) = roots.add_parsable_certificates(native_root_certs().iter().cloned());
    if ignored > 0 {
        tracing::warn!(added, ignored, "some native root certificates could not be parsed");
    }

    if let Some(path) = &settings.trusted_ca_path {
        let ca = CertificateMaterial::from_file(path)?;
        let (added, ignored) = roots.add_parsable_certificates(ca.chain().iter().cloned());
        if added == 0 {
            return Err(HttpError::Certificate(format!(
                "no usable CA certificate in {} ({ignored} rejected)",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), added, "trusting additional CA certificates");
    }

    if roots.is_empty() {
        return Err(HttpError::Tls(
            "no trusted root certificates available".into(),
        ));
    }
    Ok(roots)
}

/// Accepts any server certificate while still checking handshake signatures.
#[derive(Debug)]
struct SkipServerVerification {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io::Write;

    fn self_signed() -> (String, String) {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();
        (certified.cert.pem(), certified.key_pair.serialize_pem())
    }

    #[test]
    fn test_certificate_from_pem() {
        let (cert_pem, _) = self_signed();
        let cert = CertificateMaterial::from_pem(&cert_pem).unwrap();
        assert_eq!(cert.chain().len(), 1);
    }

    #[test]
    fn test_certificate_chain_keeps_order() {
        let (first, _) = self_signed();
        let (second, _) = self_signed();
        let bundle = format!("{first}{second}");

        let cert = CertificateMaterial::from_pem(bundle).unwrap();
        let expected = CertificateMaterial::from_pem(&first).unwrap();
        assert_eq!(cert.chain().len(), 2);
        assert_eq!(cert.chain()[0], expected.chain()[0]);
    }

    #[test]
    fn test_empty_certificate_pem_rejected() {
        let result = CertificateMaterial::from_pem("not a certificate");
        assert!(matches!(result, Err(HttpError::Certificate(_))));
    }

    #[test]
    fn test_private_key_from_pem() {
        let (_, key_pem) = self_signed();
        let key = PrivateKeyMaterial::from_pem(&key_pem).unwrap();
        assert!(matches!(key.key(), PrivateKeyDer::Pkcs8(_)));
    }

    #[test]
    fn test_private_key_debug_is_redacted() {
        let (_, key_pem) = self_signed();
        let key = PrivateKeyMaterial::from_pem(&key_pem).unwrap();
        assert!(format!("{key:?}").contains("[REDACTED]"));
    }

    #[test]
    fn test_missing_key_file_reports_path() {
        let err = PrivateKeyMaterial::from_file(Path::new("/nonexistent/key.pem")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/key.pem"));
    }

    #[test]
    fn test_insecure_config_builds_without_roots() {
        let settings = ConnectionSettings::default();
        assert!(client_tls_config(&settings, None).is_ok());
    }

    #[test]
    fn test_config_with_client_identity() {
        let (cert_pem, key_pem) = self_signed();
        let cert = CertificateMaterial::from_pem(&cert_pem).unwrap();
        let key = PrivateKeyMaterial::from_pem(&key_pem).unwrap();

        let config = client_tls_config(&ConnectionSettings::default(), Some((&cert, &key)));
        assert!(config.is_ok());
    }

    #[test]
    fn test_trusted_ca_file_is_loaded() {
        let (cert_pem, _) = self_signed();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(cert_pem.as_bytes()).unwrap();

        let settings = ConnectionSettings::default()
            .with_skip_cert_verification(false)
            .with_trusted_ca_path(file.path());
        assert!(client_tls_config(&settings, None).is_ok());
    }

    #[test]
    fn test_trusted_ca_file_without_certificates_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"garbage").unwrap();

        let settings = ConnectionSettings::default()
            .with_skip_cert_verification(false)
            .with_trusted_ca_path(file.path());
        let result = client_tls_config(&settings, None);
        assert!(matches!(result, Err(HttpError::Certificate(_))));
    }

    #[test]
    fn test_native_roots_cached() {
        let first = native_root_certs();
        let second = native_root_certs();
        assert!(std::ptr::eq(first, second), "should return same slice");
    }
}
