//! Request body digests.
//!
//! Every signed request carries `Digest: SHA-256=<base64>` computed over the exact
//! body bytes sent, including the zero-length body of a `GET`.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use http::{HeaderMap, HeaderName, HeaderValue};
use sha2::{Digest as _, Sha256};

use crate::{Result, SigningError};

/// Name of the digest header (lower-case, as stored in a [`HeaderMap`])
pub const DIGEST_HEADER: &str = "digest";

/// A computed `Digest` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestHeader {
    value: String,
}

impl DigestHeader {
    /// The header value, `SHA-256=<base64>`.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Insert the header, replacing any existing `Digest`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidHeaderValue`] if the value is not a valid header value.
    pub fn insert_into(&self, headers: &mut HeaderMap) -> Result<()> {
        let value = HeaderValue::from_str(&self.value).map_err(|e| {
            SigningError::InvalidHeaderValue {
                name: DIGEST_HEADER,
                reason: e.to_string(),
            }
        })?;
        headers.insert(HeaderName::from_static(DIGEST_HEADER), value);
        Ok(())
    }
}

/// Compute the SHA-256 digest header for a request body.
///
/// # Examples
///
/// ```
/// use psd2_signing::calculate_digest;
///
/// let digest = calculate_digest(b"");
/// assert_eq!(digest.value(), "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
/// ```
#[must_use]
pub fn calculate_digest(body: &[u8]) -> DigestHeader {
    let hash = Sha256::digest(body);
    DigestHeader {
        value: format!("SHA-256={}", STANDARD.encode(hash)),
    }
}
