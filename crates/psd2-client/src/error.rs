//! Error types for the PSD2 client.
//!
//! Errors are propagated as produced by the layer that raised them: the OAuth2
//! capability, the HTTP transport, or JSON decoding. Nothing is retried or
//! swallowed; classifying failures is up to the caller.
//!
//! # Error Categories
//!
//! - **Configuration** ([`Psd2Error::Configuration`], [`Psd2Error::SigningIdentity`]):
//!   raised by [`Psd2Client::new`](crate::Psd2Client::new) only
//! - **Token requests** ([`Psd2Error::TokenRequest`]): failures of the token endpoint exchange
//! - **Transport** ([`Psd2Error::Http`]): network and TLS failures
//! - **Bank responses** ([`Psd2Error::UnexpectedStatus`], [`Psd2Error::Decode`])

use oauth2::{RequestTokenError, basic::BasicErrorResponse};
use psd2_signing::SigningError;
use thiserror::Error;

use crate::oauth2::OAuth2HttpError;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Psd2Error>;

/// Error type of a failed token endpoint exchange, as returned by the `oauth2` crate.
pub type TokenRequestError = RequestTokenError<OAuth2HttpError, BasicErrorResponse>;

/// Errors that can occur in the PSD2 client.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Psd2Error {
    /// Client options are invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The signing certificate/key pair was rejected.
    ///
    /// Raised once, at construction. The most common cause is a private key that
    /// does not belong to the certificate.
    #[error("Configuration error: {0}")]
    SigningIdentity(#[from] SigningError),

    /// The token endpoint exchange failed.
    ///
    /// Carries the `oauth2` crate error unchanged: server error responses
    /// (`invalid_grant` and friends), transport failures, or unparsable responses.
    #[error("Token request failed: {0}")]
    TokenRequest(#[from] TokenRequestError),

    /// HTTP request to the bank failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The bank answered with a non-success status.
    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A caller-supplied or computed header is not valid.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl Psd2Error {
    /// Whether this error was raised while validating configuration.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Self::Configuration(_) => true,
            Self::SigningIdentity(e) => e.is_configuration_error(),
            _ => false,
        }
    }

    /// HTTP status of a bank error response, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
