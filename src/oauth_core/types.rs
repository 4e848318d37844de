//! Token and error types for the authorization code exchange.

use std::fmt;

use serde_json::{json, to_vec};
use tracing::warn;

use super::context::SimpleResponse;
use super::http_client::HttpClientError;

/// Result of a token exchange, as reported by the token endpoint.
///
/// A token whose `error` is set is not a credential; check [`Token::is_valid`]
/// or convert with [`Token::into_result`] before using `access_token`.
#[derive(Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Token {
    /// Dropbox user id.
    #[serde(default)]
    pub uid: String,
    /// Bearer access token, usable against the Dropbox API.
    #[serde(default)]
    pub access_token: String,
    /// Token type reported by the provider, `"bearer"` for Dropbox.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Error code, set when the response body encodes an error instead of a token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl Token {
    /// Returns the provider error code, if the body carried a non-empty one.
    pub fn provider_error(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    pub fn is_valid(&self) -> bool {
        self.provider_error().is_none() && !self.access_token.is_empty()
    }

    /// Turns a token carrying a provider error into [`OAuthError::TokenRejected`].
    pub fn into_result(self) -> Result<Token, OAuthError> {
        match self.provider_error() {
            Some(error) => Err(OAuthError::TokenRejected {
                error: error.to_string(),
                description: self.error_description.clone().unwrap_or_default(),
            }),
            None => Ok(self),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("uid", &self.uid)
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("error", &self.error)
            .field("error_description", &self.error_description)
            .finish()
    }
}

/// Failure of any step of the authorization code flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthError {
    /// The provider redirected back with an `error` parameter (RFC 6749 4.1.2.1).
    ProviderDenied { code: String, description: String },
    /// The token exchange was asked to redeem an empty code.
    MissingCode,
    /// The token request failed at the network layer.
    Transport(String),
    /// The token request did not complete within the configured timeout.
    Timeout,
    /// The inbound request was cancelled while the token request was in flight.
    Cancelled,
    /// The token endpoint answered with a body that is not a token response.
    MalformedResponse(String),
    /// The token endpoint answered with a non-success status and no error body.
    UnexpectedStatus(u16),
    /// The token endpoint answered with an `error` field instead of a token.
    TokenRejected { error: String, description: String },
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderDenied { code, description } => write!(f, "{}: {}", code, description),
            Self::MissingCode => write!(f, "Authorization code is empty"),
            Self::Transport(err) => write!(f, "Token exchange transport error: {}", err),
            Self::Timeout => write!(f, "Token exchange timed out"),
            Self::Cancelled => write!(f, "Token exchange cancelled"),
            Self::MalformedResponse(err) => write!(f, "Malformed token response: {}", err),
            Self::UnexpectedStatus(status) => {
                write!(f, "Token endpoint returned unexpected status {}", status)
            }
            Self::TokenRejected { error, description } if description.is_empty() => {
                write!(f, "{}", error)
            }
            Self::TokenRejected { error, description } => write!(f, "{}: {}", error, description),
        }
    }
}

impl std::error::Error for OAuthError {}

impl From<HttpClientError> for OAuthError {
    fn from(err: HttpClientError) -> Self {
        match err {
            HttpClientError::Timeout => Self::Timeout,
            HttpClientError::Transport(msg) => Self::Transport(msg),
        }
    }
}

impl From<serde_json::Error> for OAuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for OAuthError {
    fn from(_err: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

impl OAuthError {
    /// OAuth2 error code reported in the JSON error body.
    pub fn error_code(&self) -> &str {
        match self {
            Self::ProviderDenied { code, .. } => code,
            Self::TokenRejected { error, .. } => error,
            Self::MissingCode => "invalid_request",
            Self::Transport(_) | Self::Timeout | Self::Cancelled => "temporarily_unavailable",
            Self::MalformedResponse(_) | Self::UnexpectedStatus(_) => "server_error",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::ProviderDenied { .. } => 403,
            Self::MissingCode | Self::TokenRejected { .. } => 400,
            Self::Transport(_) | Self::MalformedResponse(_) | Self::UnexpectedStatus(_) => 502,
            Self::Timeout => 504,
            Self::Cancelled => 503,
        }
    }

    /// Convert this OAuth error into an HTTP JSON response with proper status.
    pub fn into_response(&self) -> SimpleResponse {
        let status = self.status_code();
        let code = self.error_code();
        warn!(error = %self, error_code = code, http_status = status, "OAuth error occurred");
        let json_val = json!({ "error": code, "error_description": self.to_string() });
        let body_bytes = to_vec(&json_val).unwrap_or_default();
        SimpleResponse::json(status, body_bytes)
    }
}
