//! The [`Psd2Client`] facade.

use std::sync::Arc;

use bytes::Bytes;
use chrono::TimeDelta;
use psd2_signing::SigningIdentity;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::info;
use url::Url;

use crate::config::ClientOptions;
use crate::consent::ConsentOrchestrator;
use crate::dispatch::{RequestDispatcher, RequestOptions, build_transport};
use crate::error::Result;
use crate::oauth2::{AuthorizationServer, OAuth2AuthorizationServer, OAuth2HttpClient};
use crate::token::TokenFlow;
use crate::types::{Consent, ConsentStatus, Psd2Scope, ScaStatus, TokenSet};

/// Client for a PSD2 bank API.
///
/// Holds the signing identity, the token flow and the request dispatcher. All
/// state is immutable after construction, so a client can be shared freely
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Psd2Client {
    identity: Arc<SigningIdentity>,
    tokens: TokenFlow,
    consents: ConsentOrchestrator,
    dispatcher: RequestDispatcher,
}

impl Psd2Client {
    /// Create a client using the `oauth2` crate for the authorization server.
    ///
    /// # Errors
    ///
    /// Returns a configuration error (see [`Psd2Error::is_configuration_error`](crate::Psd2Error::is_configuration_error))
    /// if the options are invalid, the signing key does not match the signing
    /// certificate, or the TLS identity cannot be loaded.
    pub fn new(options: ClientOptions) -> Result<Self> {
        options.validate()?;

        let token_transport = build_transport(&options, reqwest::redirect::Policy::none())?;
        let server = OAuth2AuthorizationServer::new(
            options.base_url_trimmed(),
            &options.client_id,
            &options.redirect_uri,
            OAuth2HttpClient::from_client(token_transport),
        )?;

        Self::build(options, Arc::new(server))
    }

    /// Create a client over a caller-provided authorization server.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_authorization_server(
        options: ClientOptions,
        server: Arc<dyn AuthorizationServer>,
    ) -> Result<Self> {
        options.validate()?;
        Self::build(options, server)
    }

    /// Assemble a client from options that passed [`ClientOptions::validate`].
    fn build(options: ClientOptions, server: Arc<dyn AuthorizationServer>) -> Result<Self> {
        let identity = Arc::new(SigningIdentity::from_hex(
            &options.certificate,
            options.certificate_key.expose_secret(),
        )?);

        let transport = build_transport(&options, reqwest::redirect::Policy::default())?;
        let dispatcher =
            RequestDispatcher::new(options.base_url_trimmed(), Arc::clone(&identity), transport);

        info!(
            key_id = %identity.key_id(),
            base_url = %options.base_url_trimmed(),
            mtls = options.ssl_certificate.is_some(),
            "PSD2 client ready"
        );

        Ok(Self {
            identity,
            tokens: TokenFlow::new(server, options.client_secret.clone()),
            consents: ConsentOrchestrator::new(dispatcher.clone()),
            dispatcher,
        })
    }

    /// The signing identity
    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }

    /// The token flow
    pub fn tokens(&self) -> &TokenFlow {
        &self.tokens
    }

    /// The consent orchestrator
    pub fn consents(&self) -> &ConsentOrchestrator {
        &self.consents
    }

    /// The request dispatcher
    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// See [`TokenFlow::create_authorization_url`].
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
        self.tokens
            .create_authorization_url(state, code_verifier, scopes)
            .await
    }

    /// See [`TokenFlow::exchange_code`].
    ///
    /// # Errors
    ///
    /// Whatever the authorization server returns.
    pub async fn validate_authorization_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenSet> {
        self.tokens.exchange_code(code, code_verifier).await
    }

    /// See [`TokenFlow::refresh`].
    ///
    /// # Errors
    ///
    /// Whatever the authorization server returns.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
        scopes: &[Psd2Scope],
    ) -> Result<TokenSet> {
        self.tokens.refresh(refresh_token, scopes).await
    }

    /// See [`ConsentOrchestrator::create_consent`].
    ///
    /// # Errors
    ///
    /// Any dispatch error of either consent call.
    pub async fn create_consent(&self, valid_for: TimeDelta) -> Result<Consent> {
        self.consents.create_consent(valid_for).await
    }

    /// See [`ConsentOrchestrator::create_consent_with_frequency`].
    ///
    /// # Errors
    ///
    /// Any dispatch error of either consent call.
    pub async fn create_consent_with_frequency(
        &self,
        valid_for: TimeDelta,
        frequency_per_day: u32,
    ) -> Result<Consent> {
        self.consents
            .create_consent_with_frequency(valid_for, frequency_per_day)
            .await
    }

    /// See [`ConsentOrchestrator::check_consent_status`].
    ///
    /// # Errors
    ///
    /// Any dispatch error.
    pub async fn check_consent_status(&self, consent_id: &str) -> Result<ConsentStatus> {
        self.consents.check_consent_status(consent_id).await
    }

    /// See [`ConsentOrchestrator::check_sca_status`].
    ///
    /// # Errors
    ///
    /// Any dispatch error.
    pub async fn check_sca_status(
        &self,
        consent_id: &str,
        authorisation_id: &str,
    ) -> Result<ScaStatus> {
        self.consents
            .check_sca_status(consent_id, authorisation_id)
            .await
    }

    /// See [`RequestDispatcher::fetch`].
    ///
    /// # Errors
    ///
    /// Any dispatch or decoding error.
    pub async fn fetch<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        self.dispatcher.fetch(path, options).await
    }

    /// See [`RequestDispatcher::fetch_text`].
    ///
    /// # Errors
    ///
    /// Any dispatch error.
    pub async fn fetch_text(&self, path: &str, options: RequestOptions) -> Result<String> {
        self.dispatcher.fetch_text(path, options).await
    }

    /// See [`RequestDispatcher::fetch_bytes`].
    ///
    /// # Errors
    ///
    /// Any dispatch error.
    pub async fn fetch_bytes(&self, path: &str, options: RequestOptions) -> Result<Bytes> {
        self.dispatcher.fetch_bytes(path, options).await
    }
}
