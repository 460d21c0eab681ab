//! # PSD2 Signing - eIDAS TPP message signatures
//!
//! Message-level authentication for Open Banking / PSD2 style APIs. Every request a
//! third-party provider (TPP) sends to a bank carries a `Digest` of its body and a
//! `Signature` over a fixed subset of headers, made with the private key of a
//! qualified certificate. The certificate itself travels in `TPP-Signature-Certificate`.
//!
//! This crate performs no I/O. It turns a certificate/key pair into a
//! [`SigningIdentity`] and computes header values from it.
//!
//! ## Architecture
//!
//! - [`identity`] - Signer identity derived from an X.509 certificate and RSA key
//! - [`digest`] - `Digest: SHA-256=...` body digests
//! - [`signature`] - Canonical header string and `Signature` header construction
//! - `test_utils` - Fixture certificates and keys (feature-gated: `test-utils`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use http::HeaderMap;
//! use psd2_signing::{SignatureCalculator, SigningIdentity, calculate_digest};
//!
//! # fn example(cert_hex: &str, key_hex: &str) -> psd2_signing::Result<()> {
//! let identity = SigningIdentity::from_hex(cert_hex, key_hex)?;
//!
//! let mut headers = HeaderMap::new();
//! calculate_digest(b"").insert_into(&mut headers)?;
//! let signature = SignatureCalculator::new(&identity).sign(&headers)?;
//! signature.insert_into(&mut headers)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `test-utils` - Deterministic fixture certificates and keys for tests

pub mod digest;
pub mod error;
pub mod identity;
pub mod signature;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use digest::{DIGEST_HEADER, DigestHeader, calculate_digest};
pub use error::SigningError;
pub use identity::SigningIdentity;
pub use signature::{
    CanonicalHeaders, SIGNATURE_HEADER, SIGNED_HEADERS, SignatureCalculator, SignatureHeaders,
    TPP_SIGNATURE_CERTIFICATE_HEADER, canonicalize,
};

/// Signing result type
pub type Result<T> = std::result::Result<T, SigningError>;

/// Algorithm label carried in the `Signature` header
pub const SIGNATURE_ALGORITHM: &str = "sha-256";
