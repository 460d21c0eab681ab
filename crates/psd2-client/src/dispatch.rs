//! Signed request dispatch.
//!
//! Every call to the bank goes through [`RequestDispatcher`]. Headers are merged in
//! a fixed order, later layers replacing earlier ones by name:
//!
//! 1. defaults: `X-Request-Id` (fresh UUID v4) and `Accept: application/json`
//! 2. caller headers
//! 3. `Digest` of the exact body bytes sent (the empty input when there is no body)
//! 4. `TPP-Signature-Certificate` and `Signature`, computed over 1-3
//!
//! `Content-Type: application/json` is added after signing when a body is sent
//! and the caller did not set one.

use std::sync::Arc;

use bytes::Bytes;
use psd2_signing::{SignatureCalculator, SigningIdentity, calculate_digest};
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::ClientOptions;
use crate::error::{Psd2Error, Result};

/// Prefix between the configured base URL and every resource path
pub const API_VERSION_PREFIX: &str = "/v1";

const JSON: &str = "application/json";

const X_REQUEST_ID: &str = "x-request-id";

/// Method, headers and body of one resource request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    method: Method,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    /// A `GET` request.
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// A `POST` request.
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    /// A request with `method`.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Set a header, replacing any previous value of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`Psd2Error::InvalidHeader`] if the name or value is not valid in HTTP.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Psd2Error::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Psd2Error::InvalidHeader(format!("{name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Merge `headers`, replacing values of names already set.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Send `body` serialized as JSON.
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// Builds, signs and sends requests to `{base_url}/v1`.
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    http: reqwest::Client,
    base_url: String,
    identity: Arc<SigningIdentity>,
}

impl RequestDispatcher {
    /// Dispatcher over an already configured transport.
    pub fn new(base_url: &str, identity: Arc<SigningIdentity>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: format!("{}{API_VERSION_PREFIX}", base_url.trim_end_matches('/')),
            identity,
        }
    }

    /// Full header set for a request with `caller` headers and `body`.
    ///
    /// # Errors
    ///
    /// Returns [`Psd2Error::SigningIdentity`] if signing fails or a computed value
    /// is not a valid header.
    pub fn prepare_headers(&self, caller: &HeaderMap, body: Option<&[u8]>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(X_REQUEST_ID), request_id()?);
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));

        headers.extend(caller.clone());

        calculate_digest(body.unwrap_or_default()).insert_into(&mut headers)?;

        SignatureCalculator::new(&self.identity)
            .sign(&headers)?
            .insert_into(&mut headers)?;

        if body.is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        }

        Ok(headers)
    }

    /// Send a request and decode the JSON response as `T`.
    ///
    /// # Errors
    ///
    /// - [`Psd2Error::Http`] if no response was received
    /// - [`Psd2Error::UnexpectedStatus`] on a non-2xx status
    /// - [`Psd2Error::Decode`] if the body is not a valid `T`
    pub async fn fetch<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        let body = self.send(path, options).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Send a request and return the response body as text.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch), without decoding.
    pub async fn fetch_text(&self, path: &str, options: RequestOptions) -> Result<String> {
        Ok(self.send(path, options).await?.text().await?)
    }

    /// Send a request and return the raw response body.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch), without decoding.
    pub async fn fetch_bytes(&self, path: &str, options: RequestOptions) -> Result<Bytes> {
        Ok(self.send(path, options).await?.bytes().await?)
    }

    #[instrument(name = "psd2.request", skip(self, options), fields(method = %options.method))]
    async fn send(&self, path: &str, options: RequestOptions) -> Result<reqwest::Response> {
        let RequestOptions {
            method,
            headers,
            body,
        } = options;

        let body = body.as_ref().map(serde_json::to_vec).transpose()?;
        let headers = self.prepare_headers(&headers, body.as_deref())?;
        let request_id = headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();

        debug!(request_id = %request_id, "sending signed request");

        let mut request = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(request_id = %request_id, status = status.as_u16(), "bank responded");

        if !status.is_success() {
            let body = response.text().await?;
            return Err(Psd2Error::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

fn request_id() -> Result<HeaderValue> {
    let mut buffer = Uuid::encode_buffer();
    let id = Uuid::new_v4().hyphenated().encode_lower(&mut buffer);
    HeaderValue::from_bytes(id.as_bytes())
        .map_err(|e| Psd2Error::InvalidHeader(format!("{X_REQUEST_ID}: {e}")))
}

/// Build the reqwest client for bank traffic, presenting the configured TLS
/// client identity if any.
///
/// # Errors
///
/// Returns [`Psd2Error::Configuration`] if the identity PEM cannot be loaded or
/// the TLS backend cannot be initialized.
pub(crate) fn build_transport(
    options: &ClientOptions,
    redirect: reqwest::redirect::Policy,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().redirect(redirect);

    if let Some(pem) = options.transport_identity_pem() {
        let identity = reqwest::Identity::from_pem(&pem)
            .map_err(|e| Psd2Error::Configuration(format!("invalid TLS client identity: {e}")))?;
        builder = builder.identity(identity);
    }

    builder
        .build()
        .map_err(|e| Psd2Error::Configuration(format!("failed to build HTTP client: {e}")))
}
