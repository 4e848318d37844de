use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// A POST to the token endpoint.
///
/// Clients must send it once and must not follow redirects; a 3xx answer is
/// returned as is.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Target URL.
    pub url: String,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// Optional request body.
    pub body: Option<Vec<u8>>,
    /// Optional timeout duration.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Gets a header value, ignoring case of the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP response from executing a call.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A response with a JSON body.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: value.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Error type for HTTP client operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpClientError {
    /// The request did not complete in time.
    Timeout,
    /// DNS, connection, TLS or I/O failure.
    Transport(String),
}

impl fmt::Display for HttpClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "Request timed out"),
            Self::Transport(err) => write!(f, "Transport error: {}", err),
        }
    }
}

impl std::error::Error for HttpClientError {}

/// Generic HTTP client interface for OAuth flows.
pub trait OAuthHttpClient: Send + Sync + Clone + 'static {
    /// Execute an HTTP request asynchronously.
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>>;
}

/// In-memory HTTP client stub for testing.
///
/// Every executed request is recorded, so tests can assert on what was sent.
#[derive(Clone, Default)]
pub struct InMemoryHttpClient {
    responses: Arc<DashMap<String, HttpResponse>>,
    default_response: Option<HttpResponse>,
    failure: Option<HttpClientError>,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl InMemoryHttpClient {
    /// Creates a new in-memory HTTP client with no default response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory HTTP client with a default response on miss.
    pub fn with_default(response: HttpResponse) -> Self {
        Self { default_response: Some(response), ..Self::default() }
    }

    /// Creates a client whose every call fails with `error`.
    pub fn failing(error: HttpClientError) -> Self {
        Self { failure: Some(error), ..Self::default() }
    }

    /// Delays every answer, to simulate a slow endpoint.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Register a mock response for a specific URL.
    pub fn insert_response(&self, url: impl Into<String>, response: HttpResponse) {
        self.responses.insert(url.into(), response);
    }

    /// Requests executed so far, oldest first.
    pub async fn recorded_requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().await.clone()
    }
}

impl OAuthHttpClient for InMemoryHttpClient {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>> {
        let responses = self.responses.clone();
        let default = self.default_response.clone();
        let failure = self.failure.clone();
        let delay = self.delay;
        let requests = self.requests.clone();
        Box::pin(async move {
            let url = request.url.clone();
            requests.lock().await.push(request);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(err) = failure {
                return Err(err);
            }
            if let Some(entry) = responses.get(&url) {
                Ok(entry.value().clone())
            } else if let Some(resp) = default {
                Ok(resp)
            } else {
                Err(HttpClientError::Transport(format!("no mock response for {}", url)))
            }
        })
    }
}

#[cfg(feature = "reqwest-client")]
pub use reqwest_client::ReqwestHttpClient;

#[cfg(feature = "reqwest-client")]
mod reqwest_client {
    use std::future::Future;
    use std::pin::Pin;

    use reqwest::redirect::Policy;
    use tracing::debug;

    use super::{HttpClientError, HttpRequest, HttpResponse, OAuthHttpClient};

    impl From<reqwest::Error> for HttpClientError {
        fn from(err: reqwest::Error) -> Self {
            if err.is_timeout() {
                Self::Timeout
            } else {
                Self::Transport(err.to_string())
            }
        }
    }

    /// HTTP client backed by a pooled `reqwest::Client` that never follows redirects.
    #[derive(Clone, Debug)]
    pub struct ReqwestHttpClient {
        client: reqwest::Client,
    }

    impl ReqwestHttpClient {
        pub fn new() -> Result<Self, HttpClientError> {
            let client = reqwest::Client::builder().redirect(Policy::none()).build()?;
            Ok(Self { client })
        }
    }

    impl OAuthHttpClient for ReqwestHttpClient {
        fn execute(
            &self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>> {
            let client = self.client.clone();
            Box::pin(async move {
                let mut builder = client.post(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                if let Some(body) = request.body {
                    builder = builder.body(body);
                }
                if let Some(timeout) = request.timeout {
                    builder = builder.timeout(timeout);
                }
                let response = builder.send().await?;
                let status = response.status().as_u16();
                let headers = response
                    .headers()
                    .iter()
                    .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
                    .collect();
                let body = response.bytes().await?.to_vec();
                debug!(status, body_len = body.len(), "HTTP response received");
                Ok::<_, HttpClientError>(HttpResponse { status, headers, body })
            })
        }
    }
}
