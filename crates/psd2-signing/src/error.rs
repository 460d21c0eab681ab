//! Signing error types.

use thiserror::Error;

/// Errors raised while loading a signing identity or producing signature headers.
///
/// Everything except [`InvalidSignature`](Self::InvalidSignature) and
/// [`InvalidHeaderValue`](Self::InvalidHeaderValue) is a configuration problem:
/// it happens once, when the identity is built, and retrying will not help.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SigningError {
    /// Certificate or key input was not valid hex.
    #[error("Invalid hex in {field}: {reason}")]
    InvalidHex {
        /// Which input failed to decode
        field: &'static str,
        /// Decoder message
        reason: String,
    },

    /// The certificate could not be parsed as DER or PEM X.509.
    #[error("Invalid signing certificate: {0}")]
    InvalidCertificate(String),

    /// The private key could not be parsed as PKCS#8 or PKCS#1.
    #[error("Invalid signing key: {0}")]
    InvalidPrivateKey(String),

    /// The certificate carries a public key this crate cannot sign for.
    #[error("Unsupported signing certificate key: {0}")]
    UnsupportedKey(String),

    /// The private key does not belong to the certificate.
    #[error("Signing key doesn't match signing certificate")]
    KeyMismatch,

    /// A signature failed to decode or verify.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// A computed value cannot be carried in an HTTP header.
    #[error("Invalid header value for {name}: {reason}")]
    InvalidHeaderValue {
        /// Header name
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

impl SigningError {
    /// Whether this error comes from the certificate/key configuration.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidHex { .. }
                | Self::InvalidCertificate(_)
                | Self::InvalidPrivateKey(_)
                | Self::UnsupportedKey(_)
                | Self::KeyMismatch
        )
    }
}
