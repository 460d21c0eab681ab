//! Core types: scopes, token sets, consent and SCA status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Psd2Error;
use crate::oauth2::TokenResponse;

/// Scope always appended to every requested scope list
pub const OFFLINE_ACCESS_SCOPE: &str = "offline_access";

/// A PSD2 scope: `PIS:`, `AIS:` or `PIIS:` followed by any suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Psd2Scope(String);

impl Psd2Scope {
    /// Recognised scope prefixes
    pub const PREFIXES: [&'static str; 3] = ["PIS:", "AIS:", "PIIS:"];

    /// Parse a scope, checking its prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Psd2Error::Configuration`] if the scope has no recognised prefix.
    pub fn new(scope: impl Into<String>) -> Result<Self, Psd2Error> {
        let scope = scope.into();
        if Self::PREFIXES.iter().any(|prefix| scope.starts_with(prefix)) {
            Ok(Self(scope))
        } else {
            Err(Psd2Error::Configuration(format!(
                "scope {scope:?} must start with PIS:, AIS: or PIIS:"
            )))
        }
    }

    /// Payment initiation scope `PIS:<suffix>`
    #[must_use]
    pub fn pis(suffix: &str) -> Self {
        Self(format!("PIS:{suffix}"))
    }

    /// Account information scope `AIS:<suffix>`
    #[must_use]
    pub fn ais(suffix: &str) -> Self {
        Self(format!("AIS:{suffix}"))
    }

    /// Funds confirmation scope `PIIS:<suffix>`
    #[must_use]
    pub fn piis(suffix: &str) -> Self {
        Self(format!("PIIS:{suffix}"))
    }

    /// The scope string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Psd2Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Psd2Scope {
    type Err = Psd2Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Psd2Scope {
    type Error = Psd2Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Psd2Scope> for String {
    fn from(scope: Psd2Scope) -> Self {
        scope.0
    }
}

/// Scope list sent upstream: the caller's scopes, in order, then `offline_access`.
///
/// Duplicates are kept as given.
pub(crate) fn with_offline_access(scopes: &[Psd2Scope]) -> Vec<String> {
    scopes
        .iter()
        .map(|scope| scope.as_str().to_owned())
        .chain(std::iter::once(OFFLINE_ACCESS_SCOPE.to_owned()))
        .collect()
}

/// Normalized result of a code exchange or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    /// Bearer access token
    pub access_token: String,
    /// Refresh token, `None` when the server did not issue one
    pub refresh_token: Option<String>,
    /// When the access token expires (`now + expires_in`, missing `expires_in` counts as 0)
    pub access_token_expires_at: DateTime<Utc>,
    /// Granted scope as returned by the server, empty if absent
    pub scope: String,
}

impl TokenSet {
    /// Normalize a raw token response relative to `now`.
    #[must_use]
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        let seconds = i64::try_from(response.expires_in.unwrap_or(0)).unwrap_or(i64::MAX);
        let access_token_expires_at = TimeDelta::try_seconds(seconds)
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            access_token_expires_at,
            scope: response.scope.unwrap_or_default(),
        }
    }

    /// Whether the access token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.access_token_expires_at
    }
}

/// Status of a consent resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsentStatus {
    /// Received, not yet authorised
    Received,
    /// Rejected by the bank or PSU
    Rejected,
    /// Authorised and usable
    Valid,
    /// Revoked by the PSU
    RevokedByPsu,
    /// Past its validity date
    Expired,
    /// Terminated by the TPP
    TerminatedByTpp,
    /// Authorised by some but not all required PSUs
    PartiallyAuthorised,
}

/// Status of a Strong Customer Authentication (SCA) process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScaStatus {
    /// Authorisation resource created
    Received,
    /// PSU identified
    PsuIdentified,
    /// PSU authenticated
    PsuAuthenticated,
    /// SCA method selected
    ScaMethodSelected,
    /// SCA started
    Started,
    /// Waiting for confirmation
    Unconfirmed,
    /// SCA completed successfully
    Finalised,
    /// SCA failed
    Failed,
    /// SCA exempted
    Exempted,
}

impl ScaStatus {
    /// Whether no further status change is expected.
    #[must_use]
    pub fn is_final(self) -> bool {
        matches!(self, Self::Finalised | Self::Failed | Self::Exempted)
    }
}

/// A consent together with its authorisation (SCA) resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consent {
    /// Consent identifier
    pub consent_id: String,
    /// Status of the consent at creation
    pub consent_status: ConsentStatus,
    /// Identifier of the authorisation resource
    pub authorisation_id: String,
    /// SCA status at creation
    pub sca_status: ScaStatus,
}
