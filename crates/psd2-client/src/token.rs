//! Authorization code and refresh token flow.
//!
//! Thin orchestration over an [`AuthorizationServer`]: PSD2 scopes are always
//! extended with `offline_access`, PKCE uses S256 and the client authenticates
//! with HTTP Basic. Errors from the server capability are returned as produced.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use secrecy::SecretString;
use tracing::instrument;
use url::Url;

use crate::error::Result;
use crate::oauth2::{
    AuthorizationServer, AuthorizationUrlRequest, ClientAuthentication, CodeChallengeMethod,
    CodeValidation, TokenRefresh,
};
use crate::types::{Psd2Scope, TokenSet, with_offline_access};

/// Token flow of a client.
#[derive(Clone)]
pub struct TokenFlow {
    server: Arc<dyn AuthorizationServer>,
    client_secret: SecretString,
}

impl TokenFlow {
    /// Create a flow over `server`, authenticating with `client_secret`.
    pub fn new(server: Arc<dyn AuthorizationServer>, client_secret: SecretString) -> Self {
        Self {
            server,
            client_secret,
        }
    }

    /// Authorization URL for `scopes` plus `offline_access`, with an S256 challenge
    /// derived from `code_verifier`.
    ///
    /// # Errors
    ///
    /// Whatever the authorization server returns.
    pub async fn create_authorization_url(
        &self,
        state: &str,
        code_verifier: &str,
        scopes: &[Psd2Scope],
    ) -> Result<Url> {
        self.server
            .create_authorization_url(AuthorizationUrlRequest {
                code_challenge_method: CodeChallengeMethod::S256,
                scopes: with_offline_access(scopes),
                code_verifier: code_verifier.to_owned(),
                state: state.to_owned(),
            })
            .await
    }

    /// Exchange an authorization code for a [`TokenSet`].
    ///
    /// # Errors
    ///
    /// Whatever the authorization server returns, typically
    /// [`Psd2Error::TokenRequest`](crate::Psd2Error::TokenRequest).
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenSet> {
        let response = self
            .server
            .validate_authorization_code(
                code,
                CodeValidation {
                    authenticate_with: ClientAuthentication::HttpBasicAuth,
                    credentials: self.client_secret.clone(),
                    code_verifier: code_verifier.to_owned(),
                },
            )
            .await?;

        Ok(TokenSet::from_response(response, Utc::now()))
    }

    /// Exchange a refresh token for a new [`TokenSet`] covering `scopes` plus
    /// `offline_access`.
    ///
    /// # Errors
    ///
    /// Whatever the authorization server returns.
    #[instrument(skip_all, fields(scopes = scopes.len()))]
    pub async fn refresh(&self, refresh_token: &str, scopes: &[Psd2Scope]) -> Result<TokenSet> {
        let response = self
            .server
            .refresh_access_token(
                refresh_token,
                TokenRefresh {
                    authenticate_with: ClientAuthentication::HttpBasicAuth,
                    credentials: self.client_secret.clone(),
                    scopes: with_offline_access(scopes),
                },
            )
            .await?;

        Ok(TokenSet::from_response(response, Utc::now()))
    }
}

impl fmt::Debug for TokenFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenFlow")
            .field("server", &self.server)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
