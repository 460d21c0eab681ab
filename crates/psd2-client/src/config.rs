//! Client configuration.
//!
//! Two independent credential pairs coexist in [`ClientOptions`]:
//!
//! - `certificate` / `certificate_key`: the qualified certificate used to sign
//!   every request at message level (hex-encoded)
//! - `ssl_certificate` / `ssl_key`: the PEM pair presented as TLS client identity
//!
//! Options are plain data and derive `Deserialize`, so they can be loaded from any
//! source the application chooses. This crate never reads files or environment
//! variables itself.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::error::{Psd2Error, Result};

/// Construction-time options of a [`Psd2Client`](crate::Psd2Client).
#[derive(Clone, Deserialize)]
pub struct ClientOptions {
    /// Bank API root, e.g. `https://api.bank.example`. Resource calls go to `{base_url}/v1`.
    pub base_url: String,
    /// OAuth2 client identifier
    pub client_id: String,
    /// OAuth2 client secret, sent with HTTP Basic authentication
    #[serde(deserialize_with = "deserialize_secret")]
    pub client_secret: SecretString,
    /// Hex-encoded signing certificate (DER or PEM)
    pub certificate: String,
    /// Hex-encoded signing private key (PKCS#8 or PKCS#1, DER or PEM)
    #[serde(deserialize_with = "deserialize_secret")]
    pub certificate_key: SecretString,
    /// OAuth2 redirect URI registered for this client
    pub redirect_uri: String,
    /// PEM certificate presented for mutual TLS
    #[serde(default)]
    pub ssl_certificate: Option<String>,
    /// PEM private key for mutual TLS
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub ssl_key: Option<SecretString>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(SecretString::new(s))
}

fn deserialize_optional_secret<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    Ok(s.map(SecretString::new))
}

impl ClientOptions {
    /// Create options without a TLS client identity.
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        certificate: impl Into<String>,
        certificate_key: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            certificate: certificate.into(),
            certificate_key: SecretString::new(certificate_key.into()),
            redirect_uri: redirect_uri.into(),
            ssl_certificate: None,
            ssl_key: None,
        }
    }

    /// Set the PEM certificate/key pair presented as TLS client identity.
    pub fn with_transport_identity(
        mut self,
        ssl_certificate: impl Into<String>,
        ssl_key: impl Into<String>,
    ) -> Self {
        self.ssl_certificate = Some(ssl_certificate.into());
        self.ssl_key = Some(SecretString::new(ssl_key.into()));
        self
    }

    /// Check the options before any key material is parsed.
    ///
    /// # Errors
    ///
    /// Returns [`Psd2Error::Configuration`] when `client_id` is empty, when
    /// `base_url` or `redirect_uri` is not an absolute URL, when `base_url` is not
    /// http(s), or when only one half of the TLS identity is set.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Psd2Error::Configuration("client_id must not be empty".into()));
        }

        let base = Url::parse(&self.base_url)
            .map_err(|e| Psd2Error::Configuration(format!("invalid base_url: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Psd2Error::Configuration(format!(
                "base_url must use http or https, got {}",
                base.scheme()
            )));
        }

        Url::parse(&self.redirect_uri)
            .map_err(|e| Psd2Error::Configuration(format!("invalid redirect_uri: {e}")))?;

        match (&self.ssl_certificate, &self.ssl_key) {
            (Some(_), Some(_)) | (None, None) => Ok(()),
            _ => Err(Psd2Error::Configuration(
                "ssl_certificate and ssl_key must be set together".into(),
            )),
        }
    }

    /// `base_url` without trailing slashes.
    pub(crate) fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Combined PEM buffer for the TLS client identity, if configured.
    pub(crate) fn transport_identity_pem(&self) -> Option<Vec<u8>> {
        let certificate = self.ssl_certificate.as_ref()?;
        let key = self.ssl_key.as_ref()?;
        Some(format!("{}\n{}", certificate.trim(), key.expose_secret().trim()).into_bytes())
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("certificate", &format_args!("<{} hex chars>", self.certificate.len()))
            .field("certificate_key", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("ssl_certificate", &self.ssl_certificate.is_some())
            .field("ssl_key", &self.ssl_key.is_some())
            .finish()
    }
}
