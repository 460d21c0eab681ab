//! reqwest adapter for the `oauth2` crate.
//!
//! The `oauth2` crate is used without its bundled HTTP client. Token requests run
//! through [`OAuth2HttpClient`], which wraps the same kind of reqwest client the
//! dispatcher uses (rustls, optional TLS client identity) but never follows
//! redirects: a token endpoint that redirects is treated as a failed exchange.

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use oauth2::AsyncHttpClient;
use oauth2::http::{self, HeaderValue, StatusCode};

/// HTTP request as produced by `oauth2`
pub type HttpRequest = http::Request<Vec<u8>>;
/// HTTP response as consumed by `oauth2`
pub type HttpResponse = http::Response<Vec<u8>>;

/// `AsyncHttpClient` implementation over reqwest.
#[derive(Clone)]
pub struct OAuth2HttpClient {
    inner: reqwest::Client,
    authorization: Option<reqwest::header::HeaderValue>,
}

impl OAuth2HttpClient {
    /// Adapter over a fresh reqwest client with redirects disabled.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, reqwest::Error> {
        let inner = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self::from_client(inner))
    }

    /// Adapter over an existing reqwest client.
    ///
    /// The client should be built with `redirect::Policy::none()`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            inner: client,
            authorization: None,
        }
    }

    /// Same transport, sending `value` as the `Authorization` header of every
    /// request.
    pub fn with_authorization(&self, value: reqwest::header::HeaderValue) -> Self {
        Self {
            inner: self.inner.clone(),
            authorization: Some(value),
        }
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, OAuth2HttpError> {
        let (parts, body) = request.into_parts();

        let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
            .map_err(|_| OAuth2HttpError::InvalidHeader(format!("Invalid method: {}", parts.method)))?;

        let mut builder = self.inner.request(method, parts.uri.to_string());
        for (name, value) in &parts.headers {
            builder = builder.header(name.as_str(), value.as_bytes());
        }
        if let Some(authorization) = &self.authorization {
            builder = builder.header(reqwest::header::AUTHORIZATION, authorization.clone());
        }

        let response = builder.body(body).send().await?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|_| OAuth2HttpError::InvalidHeader("Invalid status code".to_string()))?;

        let mut converted = http::Response::builder().status(status);
        for (name, value) in response.headers() {
            let value = HeaderValue::from_bytes(value.as_bytes())
                .map_err(|e| OAuth2HttpError::InvalidHeader(e.to_string()))?;
            converted = converted.header(name.as_str(), value);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| OAuth2HttpError::BodyRead(e.to_string()))?;

        converted
            .body(body.to_vec())
            .map_err(|e| OAuth2HttpError::InvalidHeader(e.to_string()))
    }
}

impl fmt::Debug for OAuth2HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2HttpClient")
            .field("inner", &"<reqwest::Client>")
            .field("authorization", &self.authorization.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Transport error of a token request.
#[derive(Debug)]
pub enum OAuth2HttpError {
    /// Request execution failed
    Request(reqwest::Error),

    /// Request or response could not be converted
    InvalidHeader(String),

    /// Response body could not be read
    BodyRead(String),
}

impl fmt::Display for OAuth2HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(e) => write!(f, "HTTP request failed: {e}"),
            Self::InvalidHeader(msg) => write!(f, "Invalid header value: {msg}"),
            Self::BodyRead(msg) => write!(f, "Failed to read response body: {msg}"),
        }
    }
}

impl StdError for OAuth2HttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Request(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OAuth2HttpError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e)
    }
}

/// Future returned by [`OAuth2HttpClient`]
pub type OAuth2HttpFuture<'c> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, OAuth2HttpError>> + Send + 'c>>;

impl<'c> AsyncHttpClient<'c> for OAuth2HttpClient {
    type Error = OAuth2HttpError;
    type Future = OAuth2HttpFuture<'c>;

    fn call(&'c self, request: HttpRequest) -> Self::Future {
        Box::pin(async move { self.execute(request).await })
    }
}
