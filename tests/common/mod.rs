#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use dropbox_oauth::{
    Endpoints, HandlerConfig, HttpResponse, OAuth2HandlerBuilder, OAuthCallbacks, OAuthError,
    SimpleReqCtx, SimpleResponse, Token,
};
use tokio::sync::Mutex;

pub const AUTHORIZE_URL: &str = "https://auth.local/1/oauth2/authorize";
pub const TOKEN_URL: &str = "https://auth.local/1/oauth2/token";
pub const REDIRECT_URI: &str = "https://app.local/oauth/callback";

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Success(Token),
    Error(OAuthError),
}

/// Callbacks that remember what they were called with.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl OAuthCallbacks<SimpleReqCtx> for Recorder {
    async fn on_success(&self, ctx: &mut SimpleReqCtx, token: Token) {
        ctx.response = SimpleResponse { status: 200, headers: vec![], body: token.uid.clone().into_bytes() };
        self.events.lock().await.push(Event::Success(token));
    }

    async fn on_error(&self, ctx: &mut SimpleReqCtx, error: OAuthError) {
        ctx.response = error.into_response();
        self.events.lock().await.push(Event::Error(error));
    }
}

pub fn builder() -> OAuth2HandlerBuilder {
    OAuth2HandlerBuilder::new()
        .app_key("app-key")
        .app_secret("app-secret")
        .redirect_uri(REDIRECT_URI)
        .endpoints(Endpoints {
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        })
}

pub fn config() -> HandlerConfig {
    builder().build_config().unwrap()
}

pub fn json_response(status: u16, value: serde_json::Value) -> HttpResponse {
    HttpResponse::json(status, &value)
}
