//! Common test utilities for integration tests
//!
//! Mock bank and authorization servers, fixture client options, and a recording
//! [`AuthorizationServer`] that captures what the token flow forwards.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use psd2_client::{
    AuthorizationServer, AuthorizationUrlRequest, ClientAuthentication, ClientOptions,
    CodeChallengeMethod, CodeValidation, Psd2Client, Psd2Error, TokenRefresh, TokenResponse,
};
use psd2_signing::test_utils;
use secrecy::ExposeSecret;
use serde_json::json;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";
pub const REDIRECT_URI: &str = "https://tpp.example.com/callback";
/// `Basic base64("test-client-id:test-client-secret")`
pub const BASIC_AUTHORIZATION: &str = "Basic dGVzdC1jbGllbnQtaWQ6dGVzdC1jbGllbnQtc2VjcmV0";
/// RFC 7636 appendix B verifier
pub const CODE_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
/// `Digest` of the empty body
pub const EMPTY_DIGEST: &str = "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=";

/// Options pointing at `base_url`, signing with the fixture identity.
pub fn options(base_url: &str) -> ClientOptions {
    ClientOptions::new(
        base_url,
        CLIENT_ID,
        CLIENT_SECRET,
        test_utils::SIGNING_CERTIFICATE_HEX,
        test_utils::SIGNING_KEY_HEX,
        REDIRECT_URI,
    )
}

/// Client talking to `server` for both the bank API and the token endpoint.
pub fn client(server: &MockServer) -> Psd2Client {
    Psd2Client::new(options(&server.uri())).expect("fixture options are valid")
}

/// Mock a `/token` success response.
pub async fn mock_token_success(server: &MockServer, access_token: &str, refresh_token: Option<&str>) {
    let mut body = json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": "AIS:consent-1 offline_access",
    });
    if let Some(refresh) = refresh_token {
        body["refresh_token"] = json!(refresh);
    }

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mock a `/token` error response.
pub async fn mock_token_error(server: &MockServer, error: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": error,
            "error_description": "rejected by test server",
        })))
        .mount(server)
        .await;
}

/// A call seen by [`RecordingServer`], secrets exposed for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    AuthorizationUrl {
        code_challenge_method: CodeChallengeMethod,
        scopes: Vec<String>,
        code_verifier: String,
        state: String,
    },
    ValidateCode {
        code: String,
        authenticate_with: ClientAuthentication,
        credentials: String,
        code_verifier: String,
    },
    Refresh {
        refresh_token: String,
        authenticate_with: ClientAuthentication,
        credentials: String,
        scopes: Vec<String>,
    },
}

/// [`AuthorizationServer`] that records calls and answers with canned values.
#[derive(Debug)]
pub struct RecordingServer {
    calls: Mutex<Vec<RecordedCall>>,
    url: Url,
    response: TokenResponse,
    fail_with: Option<String>,
}

impl RecordingServer {
    pub fn new(response: TokenResponse) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            url: Url::parse("https://auth.test.example/authorise?opaque=1").expect("valid url"),
            response,
            fail_with: None,
        })
    }

    /// A server whose token calls fail with `RequestTokenError::Other(message)`.
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            url: Url::parse("https://auth.test.example/authorise").expect("valid url"),
            response: TokenResponse {
                access_token: String::new(),
                refresh_token: None,
                expires_in: None,
                scope: None,
            },
            fail_with: Some(message.to_owned()),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("not poisoned").clone()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().expect("not poisoned").push(call);
    }

    fn answer(&self) -> Result<TokenResponse, Psd2Error> {
        match &self.fail_with {
            Some(message) => Err(Psd2Error::TokenRequest(oauth2::RequestTokenError::Other(
                message.clone(),
            ))),
            None => Ok(self.response.clone()),
        }
    }
}

#[async_trait]
impl AuthorizationServer for RecordingServer {
    async fn create_authorization_url(
        &self,
        request: AuthorizationUrlRequest,
    ) -> Result<Url, Psd2Error> {
        self.record(RecordedCall::AuthorizationUrl {
            code_challenge_method: request.code_challenge_method,
            scopes: request.scopes,
            code_verifier: request.code_verifier,
            state: request.state,
        });
        Ok(self.url.clone())
    }

    async fn validate_authorization_code(
        &self,
        code: &str,
        request: CodeValidation,
    ) -> Result<TokenResponse, Psd2Error> {
        self.record(RecordedCall::ValidateCode {
            code: code.to_owned(),
            authenticate_with: request.authenticate_with,
            credentials: request.credentials.expose_secret().clone(),
            code_verifier: request.code_verifier,
        });
        self.answer()
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
        request: TokenRefresh,
    ) -> Result<TokenResponse, Psd2Error> {
        self.record(RecordedCall::Refresh {
            refresh_token: refresh_token.to_owned(),
            authenticate_with: request.authenticate_with,
            credentials: request.credentials.expose_secret().clone(),
            scopes: request.scopes,
        });
        self.answer()
    }
}

/// Client over `server` (bank API) and `authorization` (token flow).
pub fn client_with(server: &MockServer, authorization: Arc<RecordingServer>) -> Psd2Client {
    Psd2Client::with_authorization_server(options(&server.uri()), authorization)
        .expect("fixture options are valid")
}
