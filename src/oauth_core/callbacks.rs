use async_trait::async_trait;

use super::types::{OAuthError, Token};

/// Implement this to decide what happens once the flow ends for a request.
///
/// `Ctx` is the application's own request/response type; the handler passes it
/// through untouched. Each dispatch calls exactly one of the two methods, or
/// neither when the browser is redirected to the consent page.
#[async_trait]
pub trait OAuthCallbacks<Ctx: Send>: Send + Sync + 'static {
    /// Called with the token of a successful exchange. Persisting it and
    /// completing the response is up to the implementor.
    async fn on_success(&self, ctx: &mut Ctx, token: Token);

    /// Called when the provider denied access or the exchange failed.
    async fn on_error(&self, ctx: &mut Ctx, error: OAuthError);
}

/// Adapts a pair of plain closures into [`OAuthCallbacks`].
pub struct CallbackFns<S, E> {
    on_success: S,
    on_error: E,
}

impl<S, E> CallbackFns<S, E> {
    pub fn new(on_success: S, on_error: E) -> Self {
        Self { on_success, on_error }
    }
}

#[async_trait]
impl<Ctx, S, E> OAuthCallbacks<Ctx> for CallbackFns<S, E>
where
    Ctx: Send,
    S: Fn(&mut Ctx, Token) + Send + Sync + 'static,
    E: Fn(&mut Ctx, OAuthError) + Send + Sync + 'static,
{
    async fn on_success(&self, ctx: &mut Ctx, token: Token) {
        (self.on_success)(ctx, token)
    }

    async fn on_error(&self, ctx: &mut Ctx, error: OAuthError) {
        (self.on_error)(ctx, error)
    }
}
