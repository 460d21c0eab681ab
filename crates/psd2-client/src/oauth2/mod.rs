//! OAuth2 authorization server capability and its `oauth2` crate implementation.

pub mod http_client;
pub mod server;

pub use http_client::{OAuth2HttpClient, OAuth2HttpError};
pub use server::{
    AuthorizationServer, AuthorizationUrlRequest, ClientAuthentication, CodeChallengeMethod,
    CodeValidation, OAuth2AuthorizationServer, TokenRefresh, TokenResponse,
};
