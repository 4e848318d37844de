use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::callbacks::OAuthCallbacks;
use super::config::{ConfigError, HandlerConfig};
use super::context::CallbackContext;
use super::form::UrlEncodedForm;
use super::http_client::{HttpRequest, HttpResponse, OAuthHttpClient};
use super::types::{OAuthError, Token};

/// What a single [`OAuth2Handler::dispatch`] did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No code yet: the browser was sent to the consent page.
    Redirected,
    /// The provider came back with an `error` parameter.
    Denied,
    /// The code was exchanged and the success callback ran.
    Authorized,
    /// The exchange failed and the error callback ran.
    Failed,
}

/// Authorization code flow handler for one provider application.
///
/// Holds no per-request state, so one instance can be shared across
/// concurrent requests. The token of each request only ever reaches the
/// application through [`OAuthCallbacks::on_success`].
pub struct OAuth2Handler<C, H> {
    config: HandlerConfig,
    http_client: C,
    callbacks: H,
}

impl<C, H> fmt::Debug for OAuth2Handler<C, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Handler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: OAuthHttpClient, H> OAuth2Handler<C, H> {
    pub fn new(config: HandlerConfig, http_client: C, callbacks: H) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, http_client, callbacks })
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// URL of the provider's consent page for this application.
    pub fn authorize_url(&self) -> String {
        let query = UrlEncodedForm::new()
            .with("client_id", self.config.app_key.as_str())
            .with("response_type", "code")
            .with("redirect_uri", self.config.redirect_uri.as_str());
        format!("{}?{}", self.config.endpoints.authorize_url, query)
    }

    fn token_request(&self, code: &str) -> HttpRequest {
        let form = UrlEncodedForm::new()
            .with("code", code)
            .with("grant_type", "authorization_code")
            .with("client_id", self.config.app_key.as_str())
            .with("client_secret", self.config.app_secret.as_str())
            .with("redirect_uri", self.config.redirect_uri.as_str());
        HttpRequest {
            url: self.config.endpoints.token_url.clone(),
            headers: vec![
                ("Content-Type".to_string(), "application/x-www-form-urlencoded".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            body: Some(form.into_bytes()),
            timeout: self.config.timeout,
        }
    }

    /// Exchanges an authorization code for a bearer token with a single POST.
    ///
    /// A body carrying a provider `error` still comes back as `Ok`; the caller
    /// decides with [`Token::into_result`]. Bounded by the configured timeout and
    /// aborted as soon as `cancel` fires.
    #[instrument(skip(self, code, cancel), fields(token_url = %self.config.endpoints.token_url), level = "debug")]
    pub async fn exchange_token(
        &self,
        code: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Token, OAuthError> {
        if code.is_empty() {
            return Err(OAuthError::MissingCode);
        }
        let call = self.http_client.execute(self.token_request(code));
        let exchange = async {
            let response = match self.config.timeout {
                Some(limit) => tokio::time::timeout(limit, call).await??,
                None => call.await?,
            };
            Ok::<_, OAuthError>(response)
        };
        let response = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(OAuthError::Cancelled),
                result = exchange => result?,
            },
            None => exchange.await?,
        };
        debug!(status = response.status, "token endpoint answered");
        parse_token_response(&response)
    }

    /// Handles one request on the redirect URI route.
    ///
    /// An `error` parameter goes to the error callback, a missing `code` gets a
    /// redirect to [`authorize_url`](Self::authorize_url), and a `code` is
    /// exchanged, with the outcome passed to the matching callback.
    #[instrument(skip_all, level = "debug")]
    pub async fn dispatch<Ctx>(&self, ctx: &mut Ctx) -> DispatchOutcome
    where
        Ctx: CallbackContext,
        H: OAuthCallbacks<Ctx>,
    {
        if let Some(code) = non_empty(ctx.param("error")) {
            let description = ctx.param("error_description").unwrap_or_default();
            let error = OAuthError::ProviderDenied { code, description };
            debug!(error = %error, "provider denied authorization");
            self.callbacks.on_error(ctx, error).await;
            return DispatchOutcome::Denied;
        }

        let Some(code) = non_empty(ctx.param("code")) else {
            let location = self.authorize_url();
            debug!(location = %location, "redirecting to authorization endpoint");
            ctx.redirect(&location);
            return DispatchOutcome::Redirected;
        };

        let cancel = ctx.cancellation();
        match self
            .exchange_token(&code, cancel.as_ref())
            .await
            .and_then(Token::into_result)
        {
            Ok(token) => {
                debug!(uid = %token.uid, "token exchange succeeded");
                self.callbacks.on_success(ctx, token).await;
                DispatchOutcome::Authorized
            }
            Err(error) => {
                debug!(error = %error, error_code = error.error_code(), "token exchange failed");
                self.callbacks.on_error(ctx, error).await;
                DispatchOutcome::Failed
            }
        }
    }
}

#[cfg(feature = "reqwest-client")]
impl<H> OAuth2Handler<super::http_client::ReqwestHttpClient, H> {
    /// Builds a handler that talks to the provider over a pooled reqwest client.
    pub fn with_reqwest(config: HandlerConfig, callbacks: H) -> Result<Self, ConfigError> {
        let http_client = super::http_client::ReqwestHttpClient::new()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Self::new(config, http_client, callbacks)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Maps a token endpoint answer to a token.
///
/// Non-2xx answers without an `error` body are `UnexpectedStatus`; a 2xx body
/// that is not JSON, or lacks both `error` and `access_token`, is malformed.
fn parse_token_response(response: &HttpResponse) -> Result<Token, OAuthError> {
    let parsed = serde_json::from_slice::<Token>(&response.body);
    match parsed {
        Ok(token) if token.provider_error().is_some() => Ok(token),
        _ if !response.is_success() => Err(OAuthError::UnexpectedStatus(response.status)),
        Err(err) => Err(err.into()),
        Ok(token) if token.access_token.is_empty() => {
            Err(OAuthError::MalformedResponse("missing access_token".to_string()))
        }
        Ok(token) => Ok(token),
    }
}
