//! Client construction tests
//!
//! Every configuration problem is reported by the constructor; no client is
//! produced from options that cannot sign or connect.

mod common;

use pretty_assertions::assert_eq;
use psd2_client::{Psd2Client, Psd2Error};
use psd2_signing::{SigningError, test_utils};

#[test]
fn test_fixture_options_build_a_client() {
    let client = Psd2Client::new(common::options("https://api.bank.example")).unwrap();
    assert_eq!(client.identity().key_id(), test_utils::SIGNING_KEY_ID);
}

#[test]
fn test_mismatched_signing_key_is_fatal() {
    // GIVEN: A signing key that does not belong to the certificate
    let mut options = common::options("https://api.bank.example");
    options.certificate_key = secrecy::SecretString::new(test_utils::UNRELATED_KEY_HEX.into());

    // WHEN: A client is constructed
    let err = Psd2Client::new(options).unwrap_err();

    // THEN: A configuration error is reported
    assert!(err.is_configuration_error());
    assert!(matches!(
        err,
        Psd2Error::SigningIdentity(SigningError::KeyMismatch)
    ));
    assert_eq!(
        err.to_string(),
        "Configuration error: Signing key doesn't match signing certificate"
    );
}

#[test]
fn test_pem_certificate_gives_same_identity() {
    let mut options = common::options("https://api.bank.example");
    options.certificate = test_utils::SIGNING_CERTIFICATE_PEM_HEX.into();

    let client = Psd2Client::new(options).unwrap();

    assert_eq!(client.identity().key_id(), test_utils::SIGNING_KEY_ID);
    assert_eq!(
        client.identity().certificate_base64(),
        test_utils::SIGNING_CERTIFICATE_BASE64.trim()
    );
}

#[test]
fn test_non_hex_certificate_is_rejected() {
    let mut options = common::options("https://api.bank.example");
    options.certificate = "not hex".into();

    let err = Psd2Client::new(options).unwrap_err();

    assert!(err.is_configuration_error());
}

#[test]
fn test_half_transport_identity_is_rejected() {
    let mut options = common::options("https://api.bank.example");
    options.ssl_certificate = Some(test_utils::TRANSPORT_CERTIFICATE_PEM.into());

    let err = Psd2Client::new(options).unwrap_err();

    assert!(matches!(err, Psd2Error::Configuration(_)));
}

#[test]
fn test_garbage_transport_identity_is_rejected() {
    let options = common::options("https://api.bank.example")
        .with_transport_identity("not a certificate", "not a key");

    let err = Psd2Client::new(options).unwrap_err();

    assert!(matches!(err, Psd2Error::Configuration(_)));
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let err = Psd2Client::new(common::options("api.bank.example")).unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_injected_server_still_gets_validated_options() {
    let server = common::RecordingServer::failing("never called");
    let err = Psd2Client::with_authorization_server(common::options("api.bank.example"), server)
        .unwrap_err();
    assert!(matches!(err, Psd2Error::Configuration(_)));
}

#[test]
fn test_client_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Psd2Client>();
}
