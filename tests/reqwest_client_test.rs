#![cfg(feature = "reqwest-client")]

mod common;

use std::time::Duration;

use common::{Event, Recorder, REDIRECT_URI};
use dropbox_oauth::{
    DispatchOutcome, Endpoints, OAuth2Handler, OAuth2HandlerBuilder, OAuthError, SimpleReqCtx,
};
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/1/oauth2/token";

fn builder_for(token_url: String) -> OAuth2HandlerBuilder {
    OAuth2HandlerBuilder::new()
        .app_key("app-key")
        .app_secret("app-secret")
        .redirect_uri(REDIRECT_URI)
        .endpoints(Endpoints {
            authorize_url: "https://auth.local/1/oauth2/authorize".to_string(),
            token_url,
        })
}

#[tokio::test]
async fn test_token_exchange_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string(
            "code=abc&grant_type=authorization_code&client_id=app-key&client_secret=app-secret\
             &redirect_uri=https%3A%2F%2Fapp.local%2Foauth%2Fcallback",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "uid": "42", "access_token": "abc", "token_type": "bearer" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let recorder = Recorder::default();
    let config = builder_for(format!("{}{}", server.uri(), TOKEN_PATH)).build_config().unwrap();
    let handler = OAuth2Handler::with_reqwest(config, recorder.clone()).unwrap();

    let mut ctx = SimpleReqCtx::from_query("code=abc");
    let outcome = handler.dispatch(&mut ctx).await;

    assert_eq!(outcome, DispatchOutcome::Authorized);
    match recorder.events().await.as_slice() {
        [Event::Success(token)] => {
            assert_eq!(token.uid, "42");
            assert_eq!(token.access_token, "abc");
        }
        other => panic!("unexpected events {:?}", other),
    }
}

#[tokio::test]
async fn test_provider_error_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "code doesn't exist or has expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = Recorder::default();
    let config = builder_for(format!("{}{}", server.uri(), TOKEN_PATH)).build_config().unwrap();
    let handler = OAuth2Handler::with_reqwest(config, recorder.clone()).unwrap();

    let mut ctx = SimpleReqCtx::from_query("code=stale");
    assert_eq!(handler.dispatch(&mut ctx).await, DispatchOutcome::Failed);
    assert_eq!(
        recorder.events().await,
        vec![Event::Error(OAuthError::TokenRejected {
            error: "invalid_grant".to_string(),
            description: "code doesn't exist or has expired".to_string(),
        })]
    );
}

#[tokio::test]
async fn test_unreachable_token_endpoint() {
    // grab a free port and release it so nothing listens there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let recorder = Recorder::default();
    let config = builder_for(format!("http://{}{}", addr, TOKEN_PATH)).build_config().unwrap();
    let handler = OAuth2Handler::with_reqwest(config, recorder.clone()).unwrap();

    let mut ctx = SimpleReqCtx::from_query("code=abc");
    assert_eq!(handler.dispatch(&mut ctx).await, DispatchOutcome::Failed);
    assert!(matches!(
        recorder.events().await.as_slice(),
        [Event::Error(OAuthError::Transport(_))]
    ));
    assert_eq!(ctx.response.status, 502);
}

#[tokio::test]
async fn test_slow_token_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "uid": "42", "access_token": "abc" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let recorder = Recorder::default();
    let config = builder_for(format!("{}{}", server.uri(), TOKEN_PATH))
        .timeout(Duration::from_millis(100))
        .build_config()
        .unwrap();
    let handler = OAuth2Handler::with_reqwest(config, recorder.clone()).unwrap();

    let mut ctx = SimpleReqCtx::from_query("code=abc");
    assert_eq!(handler.dispatch(&mut ctx).await, DispatchOutcome::Failed);
    assert_eq!(recorder.events().await, vec![Event::Error(OAuthError::Timeout)]);
}

#[tokio::test]
async fn test_redirects_from_token_endpoint_are_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "https://elsewhere.local/"))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = Recorder::default();
    let config = builder_for(format!("{}{}", server.uri(), TOKEN_PATH)).build_config().unwrap();
    let handler = OAuth2Handler::with_reqwest(config, recorder.clone()).unwrap();

    let err = handler.exchange_token("abc", None).await.unwrap_err();
    assert_eq!(err, OAuthError::UnexpectedStatus(302));
}
