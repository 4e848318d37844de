use tokio_util::sync::CancellationToken;

use super::form::UrlEncodedForm;

/// Request/response context of the embedding application, as seen by the handler.
///
/// Implement this for the web framework's request context to mount
/// [`OAuth2Handler::dispatch`](super::handler::OAuth2Handler::dispatch) on a route.
pub trait CallbackContext: Send {
    /// Looks up a request parameter from the form body or, failing that, the query string.
    fn param(&self, name: &str) -> Option<String>;

    /// Completes the response with a `302 Found` to `location`.
    fn redirect(&mut self, location: &str);

    /// Cancellation token of the inbound request, if the server propagates one.
    fn cancellation(&self) -> Option<CancellationToken> {
        None
    }
}

/// Minimal HTTP response written by [`SimpleReqCtx`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Default for SimpleResponse {
    fn default() -> Self {
        Self { status: 200, headers: Vec::new(), body: Vec::new() }
    }
}

impl SimpleResponse {
    /// `302 Found` pointing at `location`.
    pub fn found(location: impl Into<String>) -> Self {
        Self {
            status: 302,
            headers: vec![("Location".to_string(), location.into())],
            body: Vec::new(),
        }
    }

    pub fn json(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
        }
    }

    /// Gets a header value, ignoring case of the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn location(&self) -> Option<&str> {
        self.header("Location")
    }
}

/// Framework-free [`CallbackContext`] built from a raw query string and form body.
#[derive(Debug, Clone, Default)]
pub struct SimpleReqCtx {
    pub query: UrlEncodedForm,
    pub form: UrlEncodedForm,
    pub response: SimpleResponse,
    cancel: Option<CancellationToken>,
}

impl SimpleReqCtx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from a query string such as `code=abc` or `?code=abc`.
    pub fn from_query(query: &str) -> Self {
        Self { query: UrlEncodedForm::parse(query), ..Self::default() }
    }

    /// Builds a context from a request target such as `/oauth/callback?code=abc`.
    pub fn from_uri(uri: &str) -> Self {
        match uri.split_once('?') {
            Some((_, query)) => Self::from_query(query),
            None => Self::default(),
        }
    }

    /// Adds an `application/x-www-form-urlencoded` body.
    pub fn with_form_body(mut self, body: &[u8]) -> Self {
        self.form = UrlEncodedForm::parse_bytes(body);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl CallbackContext for SimpleReqCtx {
    fn param(&self, name: &str) -> Option<String> {
        self.form
            .get(name)
            .or_else(|| self.query.get(name))
            .map(str::to_string)
    }

    fn redirect(&mut self, location: &str) {
        self.response = SimpleResponse::found(location);
    }

    fn cancellation(&self) -> Option<CancellationToken> {
        self.cancel.clone()
    }
}
