//! TPP `Signature` header construction.
//!
//! Only a fixed set of headers is ever signed, no matter which headers a request
//! actually carries. The canonical form is built from the eligible headers present:
//!
//! - `headers`: their lower-cased names, sorted ascending, space separated
//! - signing string: one `"<name>: <value>"` line per header, the *lines* sorted
//!   ascending and joined by `\n`
//!
//! The signing string is ordered by whole line rather than by name. Banks verify
//! against this exact ordering.

use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::trace;

use crate::{Result, SIGNATURE_ALGORITHM, SigningError, identity::SigningIdentity};

/// Headers eligible for signing (lower-case, matched case-insensitively)
pub const SIGNED_HEADERS: [&str; 5] = [
    "digest",
    "x-request-id",
    "psu-id",
    "psu-corporate-id",
    "tpp-redirect-uri",
];

/// Name of the signature header
pub const SIGNATURE_HEADER: &str = "signature";

/// Name of the header carrying the signing certificate
pub const TPP_SIGNATURE_CERTIFICATE_HEADER: &str = "tpp-signature-certificate";

/// Canonical form of the signable headers of a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CanonicalHeaders {
    /// Space-separated, sorted, lower-case header names
    pub headers: String,
    /// Newline-separated, sorted `"name: value"` lines
    pub signing_string: String,
}

/// Build the canonical form of the signable headers in `headers`.
///
/// A header with several values is rendered once, values joined by `", "`.
///
/// # Examples
///
/// ```
/// use http::HeaderMap;
/// use psd2_signing::canonicalize;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("X-Request-Id", "abc".parse().unwrap());
/// headers.insert("Accept", "application/json".parse().unwrap());
/// headers.insert("Digest", "SHA-256=xyz".parse().unwrap());
///
/// let canonical = canonicalize(&headers);
/// assert_eq!(canonical.headers, "digest x-request-id");
/// assert_eq!(canonical.signing_string, "digest: SHA-256=xyz\nx-request-id: abc");
/// ```
#[must_use]
pub fn canonicalize(headers: &HeaderMap) -> CanonicalHeaders {
    // HeaderMap keys are already lower-case
    let mut names: Vec<&str> = headers
        .keys()
        .map(HeaderName::as_str)
        .filter(|name| SIGNED_HEADERS.contains(name))
        .collect();

    let mut lines: Vec<String> = names
        .iter()
        .map(|name| {
            let value = headers
                .get_all(*name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{name}: {value}")
        })
        .collect();

    names.sort_unstable();
    lines.sort_unstable();

    CanonicalHeaders {
        headers: names.join(" "),
        signing_string: lines.join("\n"),
    }
}

/// The two headers produced by signing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeaders {
    /// `TPP-Signature-Certificate` value: base64 DER certificate
    pub certificate: String,
    /// `Signature` value
    pub signature: String,
}

impl SignatureHeaders {
    /// Insert both headers, replacing existing ones.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidHeaderValue`] if a value contains bytes not
    /// allowed in a header (for instance control characters in the issuer name).
    pub fn insert_into(&self, headers: &mut HeaderMap) -> Result<()> {
        let certificate = header_value(TPP_SIGNATURE_CERTIFICATE_HEADER, &self.certificate)?;
        let signature = header_value(SIGNATURE_HEADER, &self.signature)?;
        headers.insert(
            HeaderName::from_static(TPP_SIGNATURE_CERTIFICATE_HEADER),
            certificate,
        );
        headers.insert(HeaderName::from_static(SIGNATURE_HEADER), signature);
        Ok(())
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| SigningError::InvalidHeaderValue {
        name,
        reason: e.to_string(),
    })
}

/// Signs header sets with a borrowed [`SigningIdentity`].
#[derive(Debug, Clone, Copy)]
pub struct SignatureCalculator<'a> {
    identity: &'a SigningIdentity,
}

impl<'a> SignatureCalculator<'a> {
    /// Create a calculator for `identity`.
    #[must_use]
    pub fn new(identity: &'a SigningIdentity) -> Self {
        Self { identity }
    }

    /// Compute `TPP-Signature-Certificate` and `Signature` for `headers`.
    ///
    /// When none of the headers is eligible, the empty signing string is still
    /// signed and `headers=""` is emitted.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidSignature`] if the RSA operation fails.
    pub fn sign(&self, headers: &HeaderMap) -> Result<SignatureHeaders> {
        let canonical = canonicalize(headers);
        trace!(headers = %canonical.headers, "signing request headers");

        let signature = self.identity.sign(canonical.signing_string.as_bytes())?;

        Ok(SignatureHeaders {
            certificate: self.identity.certificate_base64().to_owned(),
            signature: format!(
                "keyId=\"{}\",algorithm=\"{}\",headers=\"{}\",signature=\"{}\"",
                self.identity.key_id(),
                SIGNATURE_ALGORITHM,
                canonical.headers,
                signature
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CERT_DER_HEX: &str = include_str!("../tests/fixtures/signing_cert.der.hex");
    const KEY_DER_HEX: &str = include_str!("../tests/fixtures/signing_key.der.hex");

    fn identity() -> SigningIdentity {
        SigningIdentity::from_hex(CERT_DER_HEX, KEY_DER_HEX).unwrap()
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_only_signed_headers_are_kept() {
        let canonical = canonicalize(&headers(&[
            ("Accept", "application/json"),
            ("Content-Type", "application/json"),
            ("TPP-Redirect-URI", "https://tpp.example.com/cb"),
            ("PSU-ID", "psu-1"),
            ("Authorization", "Bearer t"),
        ]));

        assert_eq!(canonical.headers, "psu-id tpp-redirect-uri");
        assert_eq!(
            canonical.signing_string,
            "psu-id: psu-1\ntpp-redirect-uri: https://tpp.example.com/cb"
        );
    }

    #[test]
    fn test_all_signed_headers_sorted() {
        let canonical = canonicalize(&headers(&[
            ("X-Request-Id", "r"),
            ("TPP-Redirect-URI", "u"),
            ("PSU-Corporate-ID", "c"),
            ("PSU-ID", "p"),
            ("Digest", "d"),
        ]));

        assert_eq!(
            canonical.headers,
            "digest psu-corporate-id psu-id tpp-redirect-uri x-request-id"
        );
        assert_eq!(
            canonical.signing_string,
            "digest: d\npsu-corporate-id: c\npsu-id: p\ntpp-redirect-uri: u\nx-request-id: r"
        );
    }

    #[test]
    fn test_multiple_values_are_joined() {
        let mut map = HeaderMap::new();
        map.append("psu-id", HeaderValue::from_static("a"));
        map.append("psu-id", HeaderValue::from_static("b"));

        let canonical = canonicalize(&map);
        assert_eq!(canonical.headers, "psu-id");
        assert_eq!(canonical.signing_string, "psu-id: a, b");
    }

    #[test]
    fn test_no_eligible_headers_still_signs() {
        let identity = identity();
        let signed = SignatureCalculator::new(&identity)
            .sign(&headers(&[("Accept", "application/json")]))
            .unwrap();

        assert!(signed.signature.contains(",headers=\"\","));
        let signature = signed
            .signature
            .rsplit("signature=\"")
            .next()
            .unwrap()
            .trim_end_matches('"');
        identity.verify(b"", signature).unwrap();
    }

    #[test]
    fn test_known_answer_signature() {
        let identity = identity();
        let signed = SignatureCalculator::new(&identity)
            .sign(&headers(&[
                ("X-Request-Id", "0f7a3c52-5a8e-4d1b-9c2e-7b6f1d3e9a10"),
                ("Digest", "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="),
                ("Accept", "application/json"),
            ]))
            .unwrap();

        assert_eq!(signed.certificate, identity.certificate_base64());
        assert_eq!(
            signed.signature,
            "keyId=\"SN=3A7F21C9,CA=C=NL,O=Example Trust Services,CN=Example QWAC CA\",\
             algorithm=\"sha-256\",headers=\"digest x-request-id\",\
             signature=\"sPRcYaFyEAmiiWM8dMuYexX7UijDAv+oN+M2pZ+hqncbqMcgytiZF6e1Ix/OP/cwRoI+nOff5ljvoF+/\
             GeCF54l536toeXTAd90fssqyygoq4xBZiDtmAIZVTSpGO+01536lLJg77LkY87x7FSjkwLrfHzb/PtxlCmGRNi1F\
             DcS5L44FeGN4tjsb7MOhzhwnwRUrP9FTUqFvVkaE4R5b5Y4zgtxh+gZYF+v1/MikNI10UE4a8tfwi7FOV6dhRF6e\
             LJGFV13UneqdSnUIvmSih1w1mxyxsnlhB9WoxG7lIpj7LJpV5ISoeYGpThiFa6qTAq1jM3wg4kRbDQCMCRlOJw==\""
        );
    }

    #[test]
    fn test_insert_into_sets_both_headers() {
        let identity = identity();
        let mut map = headers(&[("Digest", "SHA-256=d")]);
        let signed = SignatureCalculator::new(&identity).sign(&map).unwrap();
        signed.insert_into(&mut map).unwrap();

        assert_eq!(
            map.get("TPP-Signature-Certificate").unwrap(),
            identity.certificate_base64()
        );
        assert!(
            map.get("Signature")
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("keyId=\"SN=3A7F21C9,")
        );
    }
}
