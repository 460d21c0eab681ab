//! Test utilities for signing
//!
//! Deterministic fixtures for tests when the `test-utils` feature is enabled:
//! a CA-issued RSA-2048 signing certificate with its key, an unrelated key for
//! mismatch scenarios, and a PEM certificate/key pair usable as an mTLS identity.
//!
//! These fixtures are public test material and must never be used in production.

use crate::{Result, SigningIdentity};

/// Signing certificate, DER, hex encoded
pub const SIGNING_CERTIFICATE_HEX: &str = include_str!("../tests/fixtures/signing_cert.der.hex");

/// Signing certificate, PEM text, hex encoded
pub const SIGNING_CERTIFICATE_PEM_HEX: &str =
    include_str!("../tests/fixtures/signing_cert.pem.hex");

/// Standard base64 of the signing certificate DER
pub const SIGNING_CERTIFICATE_BASE64: &str =
    include_str!("../tests/fixtures/signing_cert.der.b64");

/// Private key matching the signing certificate, PKCS#8 DER, hex encoded
pub const SIGNING_KEY_HEX: &str = include_str!("../tests/fixtures/signing_key.der.hex");

/// An RSA key unrelated to the signing certificate, PKCS#8 DER, hex encoded
pub const UNRELATED_KEY_HEX: &str = include_str!("../tests/fixtures/unrelated_key.der.hex");

/// PEM certificate for a transport (mTLS) identity
pub const TRANSPORT_CERTIFICATE_PEM: &str = include_str!("../tests/fixtures/transport_cert.pem");

/// PEM PKCS#8 key for a transport (mTLS) identity
pub const TRANSPORT_KEY_PEM: &str = include_str!("../tests/fixtures/transport_key.pem");

/// `keyId` derived from the fixture certificate
pub const SIGNING_KEY_ID: &str = "SN=3A7F21C9,CA=C=NL,O=Example Trust Services,CN=Example QWAC CA";

/// Load the fixture signing identity.
///
/// # Errors
///
/// Only if the fixture files are corrupted.
pub fn signing_identity() -> Result<SigningIdentity> {
    SigningIdentity::from_hex(SIGNING_CERTIFICATE_HEX, SIGNING_KEY_HEX)
}

/// Split a `Signature` header value into its `keyId`, `algorithm`, `headers` and
/// `signature` parameters.
///
/// Returns `None` if any parameter is missing.
#[must_use]
pub fn parse_signature_header(value: &str) -> Option<ParsedSignature> {
    let param = |name: &str| -> Option<String> {
        let start = value.find(&format!("{name}=\""))? + name.len() + 2;
        let end = value[start..].find('"')? + start;
        Some(value[start..end].to_owned())
    };

    Some(ParsedSignature {
        key_id: param("keyId")?,
        algorithm: param("algorithm")?,
        headers: param("headers")?,
        signature: param("signature")?,
    })
}

/// Parameters of a `Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSignature {
    /// `keyId` parameter
    pub key_id: String,
    /// `algorithm` parameter
    pub algorithm: String,
    /// `headers` parameter
    pub headers: String,
    /// Base64 `signature` parameter
    pub signature: String,
}
