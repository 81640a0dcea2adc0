use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::HttpError;
use crate::tls::{CertificateMaterial, PrivateKeyMaterial};

/// Default User-Agent string for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("candlepin-http/", env!("CARGO_PKG_VERSION"));

/// Prefix of the environment variables read by [`ConnectionSettings::load`]
pub const ENV_PREFIX: &str = "CANDLEPIN_";

/// Username used by basic-auth clients when none is given
pub const DEFAULT_USERNAME: &str = "admin";

/// Password used by basic-auth clients when none is given
pub const DEFAULT_PASSWORD: &str = "admin";

/// Where and how to connect, independent of the authentication mode.
///
/// Every field has a default, so a partial YAML file or a handful of
/// `CANDLEPIN_*` environment variables is enough to describe a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Server host name or address (default: `localhost`)
    pub host: String,

    /// Server port (default: 8443)
    pub port: u16,

    /// Servlet context the API is mounted under (default: `/candlepin`).
    ///
    /// A missing leading `/` is added when the URL is built.
    pub base_path: String,

    /// Connect over TLS (default: true)
    pub use_tls: bool,

    /// Accept any server certificate (default: true).
    ///
    /// Test deployments routinely run with self-signed certificates.
    pub skip_cert_verification: bool,

    /// PEM file with additional CA certificates to trust when verifying
    pub trusted_ca_path: Option<PathBuf>,

    /// How long to wait for a connection to be established (default: 3s)
    #[serde(with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10 MiB)
    pub max_body_size: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 8443,
            base_path: "/candlepin".to_owned(),
            use_tls: true,
            skip_cert_verification: true,
            trusted_ca_path: None,
            timeout: Duration::from_secs(3),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

impl ConnectionSettings {
    /// Load settings from defaults, an optional YAML file and `CANDLEPIN_*`
    /// environment variables, later sources overriding earlier ones.
    ///
    /// # Errors
    /// Returns `HttpError::Configuration` if a source cannot be read or a
    /// value has the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self, HttpError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| HttpError::Configuration(e.to_string()))
    }

    /// Set the host
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the base path, prepending `/` when missing
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = normalize_base_path(&base_path.into());
        self
    }

    /// Choose between `https` and plain `http`
    #[must_use]
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Enable or disable server certificate verification
    #[must_use]
    pub fn with_skip_cert_verification(mut self, skip: bool) -> Self {
        self.skip_cert_verification = skip;
        self
    }

    /// Trust the CA certificates found in the given PEM file
    #[must_use]
    pub fn with_trusted_ca_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.trusted_ca_path = Some(path.into());
        self
    }

    /// Set the connection timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The base path as used on the wire, always starting with `/`
    #[must_use]
    pub fn normalized_base_path(&self) -> String {
        normalize_base_path(&self.base_path)
    }

    /// `<https|http>://<host>:<port><basePath>`
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!(
            "{scheme}://{host}:{}{}",
            self.port,
            self.normalized_base_path()
        )
    }
}

fn normalize_base_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}

/// Serde adapter storing a `Duration` as a humantime string (`"3s"`, `"500ms"`).
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(&raw).map_err(de::Error::custom)
    }
}

/// Opaque password value.
///
/// `Debug` prints `[REDACTED]`; the buffer is zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Password(String);

impl Password {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Read-only access to the secret. Callers must not log the result.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Clone for Password {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Username and password attached pre-emptively to every request.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: Password,
}

impl BasicCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<Password>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Default for BasicCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME, DEFAULT_PASSWORD)
    }
}

/// Client certificate and key presented during the TLS handshake.
///
/// Both halves are optional here so that an incomplete identity can be
/// described; building a connection from one fails with
/// `HttpError::Configuration`.
#[derive(Debug, Clone, Default)]
pub struct ClientIdentity {
    pub certificate: Option<CertificateMaterial>,
    pub private_key: Option<PrivateKeyMaterial>,
}

impl ClientIdentity {
    #[must_use]
    pub fn new(certificate: CertificateMaterial, private_key: PrivateKeyMaterial) -> Self {
        Self {
            certificate: Some(certificate),
            private_key: Some(private_key),
        }
    }

    /// Returns both halves, or the names of the missing ones.
    ///
    /// # Errors
    /// Returns `HttpError::Configuration` listing every absent field.
    pub fn require(&self) -> Result<(&CertificateMaterial, &PrivateKeyMaterial), HttpError> {
        match (&self.certificate, &self.private_key) {
            (Some(cert), Some(key)) => Ok((cert, key)),
            (cert, key) => {
                let mut missing = Vec::new();
                if cert.is_none() {
                    missing.push("certificate");
                }
                if key.is_none() {
                    missing.push("private_key");
                }
                Err(HttpError::Configuration(format!(
                    "client certificate authentication requires {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

/// How requests are authenticated.
#[derive(Debug, Clone, Default)]
pub enum Credentials {
    #[default]
    None,
    Basic(BasicCredentials),
    ClientCertificate(ClientIdentity),
}

/// Discriminant of [`Credentials`] without the secret material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    NoAuth,
    BasicAuth,
    ClientCertificate,
}

/// Everything needed to build a secured connection: where to connect and
/// which single authentication mode to use.
///
/// The config is only ever read when a connection is built, so the same
/// value can be used to build any number of connections.
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    pub settings: ConnectionSettings,
    pub credentials: Credentials,
}

impl TransportConfig {
    #[must_use]
    pub fn no_auth(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            credentials: Credentials::None,
        }
    }

    #[must_use]
    pub fn basic_auth(settings: ConnectionSettings, credentials: BasicCredentials) -> Self {
        Self {
            settings,
            credentials: Credentials::Basic(credentials),
        }
    }

    #[must_use]
    pub fn client_certificate(settings: ConnectionSettings, identity: ClientIdentity) -> Self {
        Self {
            settings,
            credentials: Credentials::ClientCertificate(identity),
        }
    }

    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        match self.credentials {
            Credentials::None => AuthMode::NoAuth,
            Credentials::Basic(_) => AuthMode::BasicAuth,
            Credentials::ClientCertificate(_) => AuthMode::ClientCertificate,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        self.settings.base_url()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 8443);
        assert_eq!(settings.base_path, "/candlepin");
        assert!(settings.use_tls);
        assert!(settings.skip_cert_verification);
        assert_eq!(settings.trusted_ca_path, None);
        assert_eq!(settings.timeout, Duration::from_secs(3));
        assert_eq!(settings.base_url(), "https://localhost:8443/candlepin");
    }

    #[test]
    fn test_base_path_slash_is_prepended() {
        let settings = ConnectionSettings::default()
            .with_host("www.example.com")
            .with_port(8443)
            .with_base_path("no_slash_path");
        assert_eq!(settings.base_path, "/no_slash_path");
        assert_eq!(settings.base_url(), "https://www.example.com:8443/no_slash_path");
    }

    #[test]
    fn test_base_url_normalizes_raw_field() {
        let settings = ConnectionSettings {
            base_path: "raw".to_owned(),
            use_tls: false,
            ..Default::default()
        };
        assert_eq!(settings.base_url(), "http://localhost:8443/raw");
    }

    #[test]
    fn test_base_url_brackets_ipv6_host() {
        let settings = ConnectionSettings::default().with_host("::1");
        assert_eq!(settings.base_url(), "https://[::1]:8443/candlepin");
    }

    #[test]
    fn test_load_merges_yaml_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host: candlepin.example.com\nport: 443\ntimeout: 750ms").unwrap();

        let settings = ConnectionSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.host, "candlepin.example.com");
        assert_eq!(settings.port, 443);
        assert_eq!(settings.timeout, Duration::from_millis(750));
        assert_eq!(settings.base_path, "/candlepin");
    }

    #[test]
    fn test_load_rejects_bad_types() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: not-a-number").unwrap();

        let result = ConnectionSettings::load(Some(file.path()));
        assert!(matches!(result, Err(HttpError::Configuration(_))));
    }

    #[test]
    fn test_settings_serialize_timeout_as_humantime() {
        let value = serde_json::to_value(ConnectionSettings::default()).unwrap();
        assert_eq!(value["timeout"], "3s");
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let creds = BasicCredentials::new("admin", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_basic_credentials_default_to_admin() {
        let creds = BasicCredentials::default();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password.expose(), "admin");
    }

    #[test]
    fn test_missing_identity_lists_every_field() {
        let err = ClientIdentity::default().require().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("certificate"), "{msg}");
        assert!(msg.contains("private_key"), "{msg}");
    }

    #[test]
    fn test_auth_mode_follows_credentials() {
        let settings = ConnectionSettings::default();
        assert_eq!(
            TransportConfig::no_auth(settings.clone()).auth_mode(),
            AuthMode::NoAuth
        );
        assert_eq!(
            TransportConfig::basic_auth(settings.clone(), BasicCredentials::default()).auth_mode(),
            AuthMode::BasicAuth
        );
        assert_eq!(
            TransportConfig::client_certificate(settings, ClientIdentity::default()).auth_mode(),
            AuthMode::ClientCertificate
        );
    }
}
