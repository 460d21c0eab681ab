//! The OAuth2 authorization server capability.
//!
//! [`AuthorizationServer`] describes what the token flow needs from an
//! authorization server: build an authorization URL, exchange a code, refresh a
//! token. [`OAuth2AuthorizationServer`] implements it with the `oauth2` crate;
//! any other implementation can be injected through
//! [`Psd2Client::with_authorization_server`](crate::Psd2Client::with_authorization_server).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::{
    AccessToken, AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken,
    Scope, StandardRevocableToken, TokenUrl, helpers,
};
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::http_client::OAuth2HttpClient;
use crate::error::{Psd2Error, Result};

/// How the client authenticates at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientAuthentication {
    /// `Authorization: Basic base64(client_id:client_secret)` over the raw id and
    /// secret, with `client_id` also sent as a form parameter
    HttpBasicAuth,
    /// `client_id` and `client_secret` as form parameters
    RequestBody,
}

/// PKCE code challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeChallengeMethod {
    /// `BASE64URL(SHA256(code_verifier))`
    S256,
    /// The verifier itself
    Plain,
}

impl CodeChallengeMethod {
    /// Wire name of the method
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

/// Parameters of an authorization URL.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationUrlRequest {
    /// PKCE challenge method
    pub code_challenge_method: CodeChallengeMethod,
    /// Requested scopes, in order
    pub scopes: Vec<String>,
    /// PKCE code verifier the challenge is derived from
    pub code_verifier: String,
    /// Opaque CSRF state
    pub state: String,
}

/// Parameters of an authorization code exchange.
#[derive(Clone)]
pub struct CodeValidation {
    /// Client authentication method
    pub authenticate_with: ClientAuthentication,
    /// Client secret
    pub credentials: SecretString,
    /// PKCE code verifier used for the authorization URL
    pub code_verifier: String,
}

/// Parameters of a refresh token exchange.
#[derive(Clone)]
pub struct TokenRefresh {
    /// Client authentication method
    pub authenticate_with: ClientAuthentication,
    /// Client secret
    pub credentials: SecretString,
    /// Requested scopes, in order
    pub scopes: Vec<String>,
}

impl fmt::Debug for AuthorizationUrlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationUrlRequest")
            .field("code_challenge_method", &self.code_challenge_method)
            .field("scopes", &self.scopes)
            .field("code_verifier", &"<redacted>")
            .field("state", &self.state)
            .finish()
    }
}

impl fmt::Debug for CodeValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeValidation")
            .field("authenticate_with", &self.authenticate_with)
            .field("credentials", &"<redacted>")
            .field("code_verifier", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for TokenRefresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRefresh")
            .field("authenticate_with", &self.authenticate_with)
            .field("credentials", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Raw token endpoint response, before normalization into a
/// [`TokenSet`](crate::TokenSet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,
    /// Refresh token, if issued
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in: Option<u64>,
    /// Granted scope, space separated
    pub scope: Option<String>,
}

/// Token endpoint body as ASPSPs send it.
///
/// RFC 6749 section 5.1 fields, except that a missing `token_type` is read as
/// `bearer`.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct TokenEndpointResponse {
    access_token: AccessToken,
    #[serde(
        default = "bearer",
        deserialize_with = "helpers::deserialize_untagged_enum_case_insensitive"
    )]
    token_type: BasicTokenType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<RefreshToken>,
    #[serde(
        rename = "scope",
        default,
        deserialize_with = "helpers::deserialize_space_delimited_vec",
        serialize_with = "helpers::serialize_space_delimited_vec",
        skip_serializing_if = "Option::is_none"
    )]
    scopes: Option<Vec<Scope>>,
}

fn bearer() -> BasicTokenType {
    BasicTokenType::Bearer
}

impl oauth2::TokenResponse for TokenEndpointResponse {
    type TokenType = BasicTokenType;

    fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    fn token_type(&self) -> &BasicTokenType {
        &self.token_type
    }

    fn expires_in(&self) -> Option<Duration> {
        self.expires_in.map(Duration::from_secs)
    }

    fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    fn scopes(&self) -> Option<&Vec<Scope>> {
        self.scopes.as_ref()
    }
}

impl From<TokenEndpointResponse> for TokenResponse {
    fn from(response: TokenEndpointResponse) -> Self {
        Self {
            access_token: response.access_token.secret().clone(),
            refresh_token: response.refresh_token.map(|t| t.secret().clone()),
            expires_in: response.expires_in,
            scope: response.scopes.map(|scopes| {
                scopes
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            }),
        }
    }
}

/// OAuth2 authorization server used by the token flow.
#[async_trait]
pub trait AuthorizationServer: Send + Sync + fmt::Debug {
    /// Build the URL the PSU is sent to for authorization.
    async fn create_authorization_url(&self, request: AuthorizationUrlRequest) -> Result<Url>;

    /// Exchange an authorization code for tokens.
    async fn validate_authorization_code(
        &self,
        code: &str,
        request: CodeValidation,
    ) -> Result<TokenResponse>;

    /// Exchange a refresh token for new tokens.
    async fn refresh_access_token(
        &self,
        refresh_token: &str,
        request: TokenRefresh,
    ) -> Result<TokenResponse>;
}

type ConfiguredClient = Client<
    BasicErrorResponse,
    TokenEndpointResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// [`AuthorizationServer`] backed by the `oauth2` crate.
///
/// Endpoints are `{base_url}/authorise` and `{base_url}/token`.
#[derive(Debug, Clone)]
pub struct OAuth2AuthorizationServer {
    client: ConfiguredClient,
    http: OAuth2HttpClient,
}

impl OAuth2AuthorizationServer {
    /// Create the capability for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`Psd2Error::Configuration`] if an endpoint or the redirect URI is
    /// not a valid URL.
    pub fn new(
        base_url: &str,
        client_id: &str,
        redirect_uri: &str,
        http: OAuth2HttpClient,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        let auth_url = AuthUrl::new(format!("{base_url}/authorise"))
            .map_err(|e| Psd2Error::Configuration(format!("invalid authorization URL: {e}")))?;
        let token_url = TokenUrl::new(format!("{base_url}/token"))
            .map_err(|e| Psd2Error::Configuration(format!("invalid token URL: {e}")))?;
        let redirect_url = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| Psd2Error::Configuration(format!("invalid redirect_uri: {e}")))?;

        let client = Client::new(ClientId::new(client_id.to_string()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        Ok(Self { client, http })
    }

    /// Client and transport for one token request.
    ///
    /// For HTTP Basic the credentials are `base64(client_id:client_secret)` over
    /// the raw values, set on the transport. The `oauth2` client then carries no
    /// secret and sends `client_id` in the form body.
    fn authenticated(
        &self,
        authenticate_with: ClientAuthentication,
        credentials: &SecretString,
    ) -> Result<(ConfiguredClient, OAuth2HttpClient)> {
        match authenticate_with {
            ClientAuthentication::HttpBasicAuth => {
                let authorization = basic_authorization(
                    self.client.client_id().as_str(),
                    credentials.expose_secret(),
                )?;
                let client = self.client.clone().set_auth_type(AuthType::BasicAuth);
                Ok((client, self.http.with_authorization(authorization)))
            }
            ClientAuthentication::RequestBody => {
                let client = self
                    .client
                    .clone()
                    .set_client_secret(ClientSecret::new(credentials.expose_secret().clone()))
                    .set_auth_type(AuthType::RequestBody);
                Ok((client, self.http.clone()))
            }
        }
    }
}

fn basic_authorization(client_id: &str, client_secret: &str) -> Result<HeaderValue> {
    let credentials = STANDARD.encode(format!("{client_id}:{client_secret}"));
    let mut value = HeaderValue::from_str(&format!("Basic {credentials}"))
        .map_err(|e| Psd2Error::InvalidHeader(format!("authorization: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}

/// RFC 7636: 43 to 128 characters from the unreserved set.
fn check_code_verifier(verifier: &str) -> Result<()> {
    let valid_length = (43..=128).contains(&verifier.len());
    let valid_chars = verifier
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'));
    if valid_length && valid_chars {
        Ok(())
    } else {
        Err(Psd2Error::Configuration(
            "code verifier must be 43-128 unreserved characters".into(),
        ))
    }
}

#[async_trait]
impl AuthorizationServer for OAuth2AuthorizationServer {
    async fn create_authorization_url(&self, request: AuthorizationUrlRequest) -> Result<Url> {
        check_code_verifier(&request.code_verifier)?;

        let state = request.state;
        let authorize = self
            .client
            .authorize_url(|| CsrfToken::new(state))
            .add_scopes(request.scopes.into_iter().map(Scope::new));

        let (url, _state) = match request.code_challenge_method {
            CodeChallengeMethod::S256 => {
                let verifier = PkceCodeVerifier::new(request.code_verifier);
                authorize
                    .set_pkce_challenge(PkceCodeChallenge::from_code_verifier_sha256(&verifier))
                    .url()
            }
            CodeChallengeMethod::Plain => authorize
                .add_extra_param("code_challenge", request.code_verifier)
                .add_extra_param("code_challenge_method", CodeChallengeMethod::Plain.as_str())
                .url(),
        };

        Ok(url)
    }

    #[instrument(skip_all, fields(auth = ?request.authenticate_with))]
    async fn validate_authorization_code(
        &self,
        code: &str,
        request: CodeValidation,
    ) -> Result<TokenResponse> {
        let (client, http) = self.authenticated(request.authenticate_with, &request.credentials)?;
        let response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(request.code_verifier))
            .request_async(&http)
            .await?;

        debug!("authorization code exchanged");
        Ok(response.into())
    }

    #[instrument(skip_all, fields(auth = ?request.authenticate_with, scopes = request.scopes.len()))]
    async fn refresh_access_token(
        &self,
        refresh_token: &str,
        request: TokenRefresh,
    ) -> Result<TokenResponse> {
        let refresh_token = RefreshToken::new(refresh_token.to_string());
        let (client, http) = self.authenticated(request.authenticate_with, &request.credentials)?;
        let response = client
            .exchange_refresh_token(&refresh_token)
            .add_scopes(request.scopes.into_iter().map(Scope::new))
            .request_async(&http)
            .await?;

        debug!("access token refreshed");
        Ok(response.into())
    }
}
