use std::path::Path;

use async_trait::async_trait;
use candlepin_http::{
    AuthMode, BasicCredentials, CertificateMaterial, ClientIdentity, ConnectionSettings,
    Credentials, HttpClient, Password, PrivateKeyMaterial, TransportConfig,
};

use crate::api::{Api, ApiResponse, Content, WireRequest, raw_content};
use crate::error::{ClientError, ClientResult};
use crate::field_map::keys_from_wire;
use crate::identity::RegistrationIdentity;
use crate::options::OptionSet;
use crate::resources::{
    ActivationKeyApi, CdnApi, ConsumerApi, ConsumerTypeApi, ContentApi, CrlApi,
    DistributorVersionApi, EntitlementApi, EnvironmentApi, EventApi, HypervisorApi, JobApi,
    OwnerApi, OwnerContentApi, OwnerProductApi, PoolApi, ProductApi, RoleApi, RuleApi, SerialApi,
    StatisticsApi, StatusApi, SubscriptionApi, UserApi,
};

/// Options for a client-certificate client.
///
/// When the certificate and key come from a registration response or from
/// files, both fields must be left empty.
#[derive(Debug, Clone, Default)]
pub struct X509Options {
    pub settings: ConnectionSettings,
    pub certificate: Option<CertificateMaterial>,
    pub private_key: Option<PrivateKeyMaterial>,
}

impl X509Options {
    fn reject_explicit_credentials(&self) -> ClientResult<()> {
        if self.certificate.is_some() || self.private_key.is_some() {
            return Err(ClientError::Argument(
                "cannot specify certificate and private key when they are derived from another source"
                    .to_owned(),
            ));
        }
        Ok(())
    }
}

impl From<ConnectionSettings> for X509Options {
    fn from(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }
}

/// A Candlepin client bound to one server and one authentication mode.
///
/// The connection is built when the client is created and rebuilt, never
/// patched, whenever its configuration changes. Mutating methods take
/// `&mut self`; callers sharing a client across tasks must synchronize
/// those changes themselves.
#[derive(Debug, Clone)]
pub struct CandlepinClient {
    transport: TransportConfig,
    http: HttpClient,
    uuid: Option<String>,
}

impl CandlepinClient {
    /// Build a client and its connection.
    ///
    /// # Errors
    /// `Configuration` if a client-certificate transport is incomplete;
    /// `Http` if the TLS setup fails.
    pub fn new(transport: TransportConfig) -> ClientResult<Self> {
        let http = HttpClient::from_transport(&transport)?;
        Ok(Self {
            transport,
            http,
            uuid: None,
        })
    }

    /// Client without authentication.
    ///
    /// # Errors
    /// See [`new`](Self::new).
    pub fn no_auth(settings: ConnectionSettings) -> ClientResult<Self> {
        Self::new(TransportConfig::no_auth(settings))
    }

    /// Client sending HTTP Basic credentials with every request.
    ///
    /// # Errors
    /// See [`new`](Self::new).
    pub fn basic_auth(
        settings: ConnectionSettings,
        username: impl Into<String>,
        password: impl Into<Password>,
    ) -> ClientResult<Self> {
        Self::new(TransportConfig::basic_auth(
            settings,
            BasicCredentials::new(username, password),
        ))
    }

    /// Client presenting a certificate and key during the TLS handshake.
    ///
    /// # Errors
    /// `Configuration` naming whichever of the two is missing.
    pub fn client_certificate(options: X509Options) -> ClientResult<Self> {
        Self::new(TransportConfig::client_certificate(
            options.settings,
            ClientIdentity {
                certificate: options.certificate,
                private_key: options.private_key,
            },
        ))
    }

    /// Client-certificate client for a registered consumer; the consumer's
    /// uuid becomes the sticky uuid.
    ///
    /// # Errors
    /// `Argument` if `options` already carries a certificate or key; errors
    /// of the PEM material and of [`new`](Self::new) otherwise.
    pub fn from_registration_identity(
        identity: &RegistrationIdentity,
        options: X509Options,
    ) -> ClientResult<Self> {
        options.reject_explicit_credentials()?;
        let identity_material =
            ClientIdentity::new(identity.certificate()?, identity.private_key()?);
        let mut client = Self::new(TransportConfig::client_certificate(
            options.settings,
            identity_material,
        ))?;
        client.uuid.clone_from(&identity.uuid);
        Ok(client)
    }

    /// Client-certificate client with PEM material read from disk.
    ///
    /// # Errors
    /// `Argument` if `options` already carries a certificate or key; file
    /// and PEM errors otherwise.
    pub fn from_files(cert_path: &Path, key_path: &Path, options: X509Options) -> ClientResult<Self> {
        options.reject_explicit_credentials()?;
        let identity = ClientIdentity::new(
            CertificateMaterial::from_file(cert_path)?,
            PrivateKeyMaterial::from_file(key_path)?,
        );
        Self::new(TransportConfig::client_certificate(options.settings, identity))
    }

    /// Replace the Basic credentials and rebuild the connection.
    ///
    /// On failure the previous credentials and connection stay in place.
    ///
    /// # Errors
    /// `Argument` for a client not using Basic authentication.
    pub fn switch_credentials(
        &mut self,
        username: impl Into<String>,
        password: impl Into<Password>,
    ) -> ClientResult<()> {
        if self.transport.auth_mode() != AuthMode::BasicAuth {
            return Err(ClientError::Argument(format!(
                "credentials can only be switched on a basic-auth client, this one uses {:?}",
                self.transport.auth_mode()
            )));
        }
        let mut transport = self.transport.clone();
        transport.credentials = Credentials::Basic(BasicCredentials::new(username, password));
        self.replace_transport(transport)
    }

    /// Apply a settings change and rebuild the connection.
    ///
    /// # Errors
    /// Connection build errors; the client is left unchanged.
    pub fn reconfigure<F>(&mut self, change: F) -> ClientResult<()>
    where
        F: FnOnce(&mut ConnectionSettings),
    {
        let mut transport = self.transport.clone();
        change(&mut transport.settings);
        self.replace_transport(transport)
    }

    /// Rebuild the connection from the current configuration.
    ///
    /// # Errors
    /// Connection build errors; the client is left unchanged.
    pub fn reload(&mut self) -> ClientResult<()> {
        let transport = self.transport.clone();
        self.replace_transport(transport)
    }

    fn replace_transport(&mut self, transport: TransportConfig) -> ClientResult<()> {
        let http = HttpClient::from_transport(&transport)?;
        self.transport = transport;
        self.http = http;
        tracing::debug!(base_url = %self.http.base_url(), "candlepin connection rebuilt");
        Ok(())
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        self.transport.auth_mode()
    }

    #[must_use]
    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    pub fn set_uuid(&mut self, uuid: Option<String>) {
        self.uuid = uuid;
    }

    #[must_use]
    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    /// Register a consumer and return a client authenticated as it.
    ///
    /// The new client uses this client's connection settings; its sticky
    /// uuid is the new consumer's uuid.
    ///
    /// # Errors
    /// Registration errors, `UnexpectedStatus` if the server refused the
    /// registration, `Decode` if the response lacks an identity certificate.
    pub async fn register_and_get_client(&self, opts: OptionSet) -> ClientResult<CandlepinClient> {
        let consumer = self.register(opts).await?.ok_json()?;
        let identity = RegistrationIdentity::from_value(&consumer)?;
        Self::from_registration_identity(&identity, X509Options::from(self.transport.settings.clone()))
    }
}

#[async_trait]
impl Api for CandlepinClient {
    fn sticky_uuid(&self) -> Option<String> {
        self.uuid.clone()
    }

    async fn execute(&self, request: WireRequest) -> ClientResult<ApiResponse> {
        let mut builder = self
            .http
            .request(request.method.clone(), &request.path)
            .query(&request.query);
        if let Some(media_type) = request.accept {
            builder = builder.accept(media_type);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let content_type = response.content_type().map(str::to_owned);

        let content = if request.accept.is_some() {
            raw_content(response.bytes().await?)
        } else {
            match response.negotiate().await? {
                Content::Json(value) => Content::Json(keys_from_wire(value)),
                other => other,
            }
        };

        if !status.is_success() {
            tracing::debug!(
                method = %request.method,
                path = %request.path,
                status = status.as_u16(),
                "candlepin returned an error status"
            );
        }

        Ok(ApiResponse {
            status,
            content_type,
            content,
        })
    }
}

impl StatusApi for CandlepinClient {}
impl CrlApi for CandlepinClient {}
impl StatisticsApi for CandlepinClient {}
impl SerialApi for CandlepinClient {}
impl EventApi for CandlepinClient {}
impl JobApi for CandlepinClient {}
impl RuleApi for CandlepinClient {}
impl ConsumerTypeApi for CandlepinClient {}
impl ConsumerApi for CandlepinClient {}
impl HypervisorApi for CandlepinClient {}
impl EnvironmentApi for CandlepinClient {}
impl ActivationKeyApi for CandlepinClient {}
impl EntitlementApi for CandlepinClient {}
impl PoolApi for CandlepinClient {}
impl SubscriptionApi for CandlepinClient {}
impl UserApi for CandlepinClient {}
impl RoleApi for CandlepinClient {}
impl OwnerApi for CandlepinClient {}
impl OwnerContentApi for CandlepinClient {}
impl ContentApi for CandlepinClient {}
impl OwnerProductApi for CandlepinClient {}
impl ProductApi for CandlepinClient {}
impl DistributorVersionApi for CandlepinClient {}
impl CdnApi for CandlepinClient {}
