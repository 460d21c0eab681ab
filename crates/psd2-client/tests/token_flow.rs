//! Token flow tests against a recording authorization server
//!
//! Verifies what the flow forwards to the capability (challenge method, scopes,
//! client authentication) and how responses are normalized into a `TokenSet`.

mod common;

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use common::{CLIENT_SECRET, CODE_VERIFIER, RecordedCall, RecordingServer};
use pretty_assertions::assert_eq;
use psd2_client::{
    ClientAuthentication, CodeChallengeMethod, Psd2Client, Psd2Error, Psd2Scope, TokenResponse,
};

fn client(server: Arc<RecordingServer>) -> Psd2Client {
    Psd2Client::with_authorization_server(common::options("https://api.bank.example"), server)
        .expect("fixture options are valid")
}

fn full_response() -> TokenResponse {
    TokenResponse {
        access_token: "test-access-token".into(),
        refresh_token: Some("test-refresh-token".into()),
        expires_in: Some(3600),
        scope: Some("test-scope".into()),
    }
}

#[tokio::test]
async fn test_authorization_url_forwards_s256_and_offline_access() {
    // GIVEN: A recording authorization server
    let server = RecordingServer::new(full_response());
    let client = client(server.clone());

    // WHEN: An authorization URL is requested for two PIS scopes
    let url = client
        .create_authorization_url(
            "test-state",
            CODE_VERIFIER,
            &[Psd2Scope::pis("scope1"), Psd2Scope::pis("scope2")],
        )
        .await
        .unwrap();

    // THEN: The capability URL is returned unchanged
    assert_eq!(&url, server.url());

    // AND: S256, the scopes plus offline_access, the verifier and state were forwarded
    assert_eq!(
        server.calls(),
        vec![RecordedCall::AuthorizationUrl {
            code_challenge_method: CodeChallengeMethod::S256,
            scopes: vec!["PIS:scope1".into(), "PIS:scope2".into(), "offline_access".into()],
            code_verifier: CODE_VERIFIER.into(),
            state: "test-state".into(),
        }]
    );
}

#[tokio::test]
async fn test_offline_access_is_not_deduplicated() {
    let server = RecordingServer::new(full_response());
    let client = client(server.clone());

    client
        .create_authorization_url("s", CODE_VERIFIER, &[])
        .await
        .unwrap();

    let calls = server.calls();
    let [RecordedCall::AuthorizationUrl { scopes, .. }] = calls.as_slice() else {
        panic!("expected one authorization URL call");
    };
    assert_eq!(scopes, &vec!["offline_access".to_string()]);
}

#[tokio::test]
async fn test_code_exchange_uses_basic_auth_and_normalizes() {
    // GIVEN: A server returning a complete token response
    let server = RecordingServer::new(full_response());
    let client = client(server.clone());

    // WHEN: A code is exchanged
    let before = Utc::now();
    let tokens = client
        .validate_authorization_code("test-code", CODE_VERIFIER)
        .await
        .unwrap();
    let after = Utc::now();

    // THEN: HTTP Basic with the client secret and the verifier were forwarded
    assert_eq!(
        server.calls(),
        vec![RecordedCall::ValidateCode {
            code: "test-code".into(),
            authenticate_with: ClientAuthentication::HttpBasicAuth,
            credentials: CLIENT_SECRET.into(),
            code_verifier: CODE_VERIFIER.into(),
        }]
    );

    // AND: The token set is normalized
    assert_eq!(tokens.access_token, "test-access-token");
    assert_eq!(tokens.refresh_token.as_deref(), Some("test-refresh-token"));
    assert_eq!(tokens.scope, "test-scope");
    assert!(tokens.access_token_expires_at >= before + TimeDelta::seconds(3600));
    assert!(tokens.access_token_expires_at <= after + TimeDelta::seconds(3600));
}

#[tokio::test]
async fn test_missing_optional_fields_normalize() {
    let server = RecordingServer::new(TokenResponse {
        access_token: "T".into(),
        refresh_token: None,
        expires_in: None,
        scope: None,
    });
    let client = client(server);

    let before = Utc::now();
    let tokens = client
        .validate_authorization_code("code", CODE_VERIFIER)
        .await
        .unwrap();
    let after = Utc::now();

    assert_eq!(tokens.access_token, "T");
    assert_eq!(tokens.refresh_token, None);
    assert_eq!(tokens.scope, "");
    assert!(tokens.access_token_expires_at >= before);
    assert!(tokens.access_token_expires_at <= after);
}

#[tokio::test]
async fn test_refresh_appends_offline_access() {
    let server = RecordingServer::new(full_response());
    let client = client(server.clone());

    let tokens = client
        .refresh_access_token(
            "test-token",
            &[Psd2Scope::pis("scope1"), Psd2Scope::pis("scope2")],
        )
        .await
        .unwrap();

    assert_eq!(
        server.calls(),
        vec![RecordedCall::Refresh {
            refresh_token: "test-token".into(),
            authenticate_with: ClientAuthentication::HttpBasicAuth,
            credentials: CLIENT_SECRET.into(),
            scopes: vec!["PIS:scope1".into(), "PIS:scope2".into(), "offline_access".into()],
        }]
    );
    assert_eq!(tokens.access_token, "test-access-token");
}

#[tokio::test]
async fn test_capability_errors_propagate_unchanged() {
    // GIVEN: A server whose token calls fail
    let server = RecordingServer::failing("invalid_grant");
    let client = client(server);

    // WHEN: A code is exchanged
    let err = client
        .validate_authorization_code("code", CODE_VERIFIER)
        .await
        .unwrap_err();

    // THEN: The capability's error comes back as is
    match err {
        Psd2Error::TokenRequest(oauth2::RequestTokenError::Other(message)) => {
            assert_eq!(message, "invalid_grant");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
