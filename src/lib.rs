//! Dropbox OAuth2 authorization code handler.
//!
//! Mount [`OAuth2Handler::dispatch`] on the route registered as the redirect URI.
//! A request without `code` is redirected to the Dropbox consent page; a request
//! coming back with `code` is exchanged for a bearer token and handed to the
//! application's [`OAuthCallbacks`].

pub mod oauth_core;

pub use oauth_core::callbacks::{CallbackFns, OAuthCallbacks};
pub use oauth_core::config::{
    ConfigError, Endpoints, HandlerConfig, OAuth2HandlerBuilder, DEFAULT_EXCHANGE_TIMEOUT,
    DROPBOX_AUTHORIZE_URL, DROPBOX_TOKEN_URL,
};
pub use oauth_core::context::{CallbackContext, SimpleReqCtx, SimpleResponse};
pub use oauth_core::form::{decode_url_owned, encode_url_owned, UrlEncodedForm};
pub use oauth_core::handler::{DispatchOutcome, OAuth2Handler};
pub use oauth_core::http_client::{
    HttpClientError, HttpRequest, HttpResponse, InMemoryHttpClient, OAuthHttpClient,
};
#[cfg(feature = "reqwest-client")]
pub use oauth_core::http_client::ReqwestHttpClient;
pub use oauth_core::types::{OAuthError, Token};
