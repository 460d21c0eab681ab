//! Consent and authorization URL walkthrough
//!
//! Loads `ClientOptions` from a JSON file, creates a 90 day account information
//! consent, and prints the URL the PSU has to visit to authorise it.
//!
//! ```text
//! RUST_LOG=psd2_client=debug cargo run -p psd2-client --example consent_authorisation -- options.json
//! ```
//!
//! The options file carries the fields of `ClientOptions`:
//! `base_url`, `client_id`, `client_secret`, `certificate` and `certificate_key`
//! (hex), `redirect_uri`, and optionally `ssl_certificate` / `ssl_key` (PEM).

use chrono::TimeDelta;
use psd2_client::{ClientOptions, Psd2Client, Psd2Scope};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: consent_authorisation <options.json>")?;
    let options: ClientOptions = serde_json::from_str(&std::fs::read_to_string(path)?)?;

    // Step 1: Build the client; a mismatched signing pair fails here
    let client = Psd2Client::new(options)?;
    println!("Signing as {}\n", client.identity().key_id());

    // Step 2: Create the consent and its authorisation resource
    let consent = client.create_consent(TimeDelta::days(90)).await?;
    println!("Consent {} is {:?}", consent.consent_id, consent.consent_status);
    println!(
        "Authorisation {} is {:?}\n",
        consent.authorisation_id, consent.sca_status
    );

    // Step 3: Send the PSU to the bank to authorise it
    let state = uuid::Uuid::new_v4().to_string();
    let code_verifier = format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple());
    let url = client
        .create_authorization_url(&state, &code_verifier, &[Psd2Scope::ais(&consent.consent_id)])
        .await?;

    println!("Open in a browser:\n   {url}\n");
    println!("Keep the code verifier for the code exchange:\n   {code_verifier}\n");

    // Step 4: Poll until the bank reports a final SCA status
    println!(
        "Then call check_sca_status(\"{}\", \"{}\") until it is final,",
        consent.consent_id, consent.authorisation_id
    );
    println!("and validate_authorization_code(code, verifier) with the code from the redirect.");

    Ok(())
}
