//! Handler configuration and its builder.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::handler::OAuth2Handler;
use super::http_client::OAuthHttpClient;

pub const DROPBOX_AUTHORIZE_URL: &str = "https://www.dropbox.com/1/oauth2/authorize";
pub const DROPBOX_TOKEN_URL: &str = "https://api.dropbox.com/1/oauth2/token";

/// Upper bound on the token exchange unless configured otherwise.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider endpoints. Defaults to Dropbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

fn default_authorize_url() -> String {
    DROPBOX_AUTHORIZE_URL.to_string()
}

fn default_token_url() -> String {
    DROPBOX_TOKEN_URL.to_string()
}

impl Default for Endpoints {
    fn default() -> Self {
        Self { authorize_url: default_authorize_url(), token_url: default_token_url() }
    }
}

/// Error raised while building a handler. Never reaches the callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingField(&'static str),
    InvalidUrl { field: &'static str, value: String },
    Json(String),
    HttpClient(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "Missing configuration field: {}", field),
            Self::InvalidUrl { field, value } => {
                write!(f, "Invalid URL for {}: {:?}", field, value)
            }
            Self::Json(err) => write!(f, "Invalid JSON configuration: {}", err),
            Self::HttpClient(err) => write!(f, "Failed to build HTTP client: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Serialized form of [`HandlerConfig`], e.g. a section of the application's config file.
///
/// `timeout_secs` defaults to 30; `0` disables the handler-level timeout.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHandlerConfig {
    pub app_key: String,
    pub app_secret: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub endpoints: Endpoints,
}

/// Application credentials and redirect URI, fixed for the handler's lifetime.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawHandlerConfig")]
pub struct HandlerConfig {
    /// App key (`client_id`).
    pub app_key: String,
    /// App secret (`client_secret`). Only ever sent to the token endpoint.
    pub app_secret: String,
    /// Must match the redirect URI registered with the provider exactly.
    pub redirect_uri: String,
    /// Upper bound on the token exchange; `None` leaves it to the HTTP client.
    pub timeout: Option<Duration>,
    pub endpoints: Endpoints,
}

impl HandlerConfig {
    /// Creates a validated configuration with the Dropbox endpoints and the default timeout.
    pub fn new(
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            redirect_uri: redirect_uri.into(),
            timeout: Some(DEFAULT_EXCHANGE_TIMEOUT),
            endpoints: Endpoints::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn builder() -> OAuth2HandlerBuilder {
        OAuth2HandlerBuilder::new()
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let raw: RawHandlerConfig = serde_json::from_str(input)?;
        Self::try_from(raw)
    }

    /// Checks required fields and that every URL is absolute http(s).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_key.is_empty() {
            return Err(ConfigError::MissingField("app_key"));
        }
        if self.app_secret.is_empty() {
            return Err(ConfigError::MissingField("app_secret"));
        }
        if self.redirect_uri.is_empty() {
            return Err(ConfigError::MissingField("redirect_uri"));
        }
        check_http_url("redirect_uri", &self.redirect_uri)?;
        check_http_url("authorize_url", &self.endpoints.authorize_url)?;
        check_http_url("token_url", &self.endpoints.token_url)?;
        Ok(())
    }
}

fn check_http_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidUrl { field, value: value.to_string() };
    let parsed = Url::parse(value).map_err(|_| invalid())?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(invalid()),
    }
}

impl TryFrom<RawHandlerConfig> for HandlerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawHandlerConfig) -> Result<Self, Self::Error> {
        let timeout = match raw.timeout_secs {
            None => Some(DEFAULT_EXCHANGE_TIMEOUT),
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        };
        let config = Self {
            app_key: raw.app_key,
            app_secret: raw.app_secret,
            redirect_uri: raw.redirect_uri,
            timeout,
            endpoints: raw.endpoints,
        };
        config.validate()?;
        Ok(config)
    }
}

impl fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConfig")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("timeout", &self.timeout)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// Builder for [`HandlerConfig`] and [`OAuth2Handler`].
#[derive(Clone, Default)]
pub struct OAuth2HandlerBuilder {
    app_key: Option<String>,
    app_secret: Option<String>,
    redirect_uri: Option<String>,
    timeout: Option<Option<Duration>>,
    endpoints: Option<Endpoints>,
}

impl OAuth2HandlerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn app_key(mut self, app_key: impl Into<String>) -> Self {
        self.app_key = Some(app_key.into());
        self
    }

    pub fn app_secret(mut self, app_secret: impl Into<String>) -> Self {
        self.app_secret = Some(app_secret.into());
        self
    }

    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Bounds the token exchange.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(Some(timeout));
        self
    }

    /// Leaves the token exchange unbounded apart from the HTTP client's own policy.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = Some(None);
        self
    }

    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn build_config(self) -> Result<HandlerConfig, ConfigError> {
        let config = HandlerConfig {
            app_key: self.app_key.ok_or(ConfigError::MissingField("app_key"))?,
            app_secret: self.app_secret.ok_or(ConfigError::MissingField("app_secret"))?,
            redirect_uri: self.redirect_uri.ok_or(ConfigError::MissingField("redirect_uri"))?,
            timeout: self.timeout.unwrap_or(Some(DEFAULT_EXCHANGE_TIMEOUT)),
            endpoints: self.endpoints.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Builds the handler around an HTTP client and the application's callbacks.
    pub fn build<C, H>(self, http_client: C, callbacks: H) -> Result<OAuth2Handler<C, H>, ConfigError>
    where
        C: OAuthHttpClient,
    {
        let config = self.build_config()?;
        OAuth2Handler::new(config, http_client, callbacks)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builder_requires_credentials() {
        let err = OAuth2HandlerBuilder::new()
            .app_key("key")
            .redirect_uri("https://app.local/cb")
            .build_config()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingField("app_secret"));
    }

    #[test]
    fn builder_rejects_non_http_redirect() {
        let err = OAuth2HandlerBuilder::new()
            .app_key("key")
            .app_secret("secret")
            .redirect_uri("ftp://app.local/cb")
            .build_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { field: "redirect_uri", .. }));
    }

    #[test]
    fn builder_defaults_to_dropbox() {
        let config = OAuth2HandlerBuilder::new()
            .app_key("key")
            .app_secret("secret")
            .redirect_uri("https://app.local/cb")
            .build_config()
            .unwrap();
        assert_eq!(config.endpoints.authorize_url, DROPBOX_AUTHORIZE_URL);
        assert_eq!(config.endpoints.token_url, DROPBOX_TOKEN_URL);
        assert_eq!(config.timeout, Some(DEFAULT_EXCHANGE_TIMEOUT));
    }

    #[test]
    fn json_config_timeout_and_endpoints() {
        let config = HandlerConfig::from_json(
            r#"{
                "app_key": "key",
                "app_secret": "secret",
                "redirect_uri": "https://app.local/cb",
                "timeout_secs": 0,
                "endpoints": { "token_url": "http://127.0.0.1:9000/token" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.timeout, None);
        assert_eq!(config.endpoints.token_url, "http://127.0.0.1:9000/token");
        assert_eq!(config.endpoints.authorize_url, DROPBOX_AUTHORIZE_URL);

        let err = HandlerConfig::from_json(r#"{"app_key": "key"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn debug_redacts_secret() {
        let config = HandlerConfig::new("key", "very-secret", "https://app.local/cb").unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("very-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
