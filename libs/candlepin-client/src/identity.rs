use candlepin_http::{CertificateMaterial, PrivateKeyMaterial};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

/// The identity certificate issued to a consumer at registration.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityCertificate {
    /// PEM certificate
    pub cert: String,
    /// PEM private key
    pub key: String,
}

/// The part of a registration response needed to authenticate as the
/// registered consumer.
///
/// Accepts the response in either key convention (`idCert` as sent by the
/// server, `id_cert` after client-side key conversion).
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationIdentity {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(alias = "idCert")]
    pub id_cert: IdentityCertificate,
}

impl RegistrationIdentity {
    /// Extract the identity from a registration response body.
    ///
    /// # Errors
    /// `Decode` if the body lacks an identity certificate.
    pub fn from_value(value: &Value) -> ClientResult<Self> {
        Self::deserialize(value)
            .map_err(|e| ClientError::Decode(format!("invalid registration identity: {e}")))
    }

    /// # Errors
    /// Fails if the certificate PEM does not parse.
    pub fn certificate(&self) -> ClientResult<CertificateMaterial> {
        Ok(CertificateMaterial::from_pem(self.id_cert.cert.as_bytes())?)
    }

    /// # Errors
    /// Fails if the key PEM does not parse.
    pub fn private_key(&self) -> ClientResult<PrivateKeyMaterial> {
        Ok(PrivateKeyMaterial::from_pem(self.id_cert.key.as_bytes())?)
    }
}
