//! IAM bearer tokens: refresh before expiry, reuse while valid, shared refreshes.

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{context, MockServerFixture};
use mockito::Matcher;
use reqwest::Method;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use watson_sdk::auth::{Credentials, IamToken};
use watson_sdk::transport::{Connector, RequestDescriptor, ResponseDescriptor};
use watson_sdk::ErrorKind;

const FRESH_TOKEN: &str = r#"{"access_token":"fresh","refresh_token":"r2","token_type":"Bearer","expires_in":3600}"#;

async fn call(connector: &Connector) -> ResponseDescriptor {
    let (tx, rx) = oneshot::channel();
    let req = RequestDescriptor::builder(Method::GET)
        .on_complete(move |resp, _| {
            let _ = tx.send(resp);
        })
        .build();
    assert!(connector.send(req));
    tokio::time::timeout(Duration::from_secs(10), rx)
        .await
        .expect("callback did not fire")
        .expect("callback dropped")
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once_before_sending() {
    let mut fixture = MockServerFixture::new().await;
    let iam = fixture
        .server
        .mock("POST", "/identity/token")
        .match_header("authorization", "Basic Yng6Yng=")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "r1".into()),
        ]))
        .with_status(200)
        .with_body(FRESH_TOKEN)
        .expect(1)
        .create_async()
        .await;
    let service = fixture
        .server
        .mock("GET", "/api/v1/things")
        .match_header("authorization", "Bearer fresh")
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let token = IamToken::new("stale")
        .with_refresh_token("r1")
        .with_expiry(Utc::now() - ChronoDuration::hours(1));
    let creds = Credentials::iam_token(token)
        .with_iam_url(fixture.iam_url())
        .with_url(fixture.service_url());
    let ctx = context();
    let connector = Connector::new(&ctx, &creds, "/v1/things").unwrap();

    let resp = call(&connector).await;
    assert!(resp.success, "unexpected error: {:?}", resp.error);
    iam.assert_async().await;
    service.assert_async().await;
}

#[tokio::test]
async fn test_valid_token_triggers_no_refresh() {
    let mut fixture = MockServerFixture::new().await;
    let iam = fixture
        .server
        .mock("POST", "/identity/token")
        .with_status(200)
        .with_body(FRESH_TOKEN)
        .expect(0)
        .create_async()
        .await;
    let service = fixture
        .server
        .mock("GET", "/api/v1/things")
        .match_header("authorization", "Bearer still-good")
        .with_status(200)
        .with_body("{}")
        .expect(2)
        .create_async()
        .await;

    let token = IamToken::new("still-good")
        .with_refresh_token("r1")
        .with_expiry(Utc::now() + ChronoDuration::hours(1));
    let creds = Credentials::iam_token(token)
        .with_iam_url(fixture.iam_url())
        .with_url(fixture.service_url());
    let ctx = context();
    let connector = Connector::new(&ctx, &creds, "/v1/things").unwrap();

    assert!(call(&connector).await.success);
    assert!(call(&connector).await.success);
    iam.assert_async().await;
    service.assert_async().await;
}

#[tokio::test]
async fn test_api_key_is_exchanged_once_for_concurrent_calls() {
    let mut fixture = MockServerFixture::new().await;
    let iam = fixture
        .server
        .mock("POST", "/identity/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "urn:ibm:params:oauth:grant-type:apikey".into()),
            Matcher::UrlEncoded("apikey".into(), "my-key".into()),
        ]))
        .with_status(200)
        .with_body(FRESH_TOKEN)
        .expect(1)
        .create_async()
        .await;
    let service = fixture
        .server
        .mock("GET", "/api/v1/things")
        .match_header("authorization", "Bearer fresh")
        .with_status(200)
        .with_body("{}")
        .expect(5)
        .create_async()
        .await;

    let creds = Credentials::iam_api_key("my-key")
        .with_iam_url(fixture.iam_url())
        .with_url(fixture.service_url());
    let ctx = context();
    let connector = Connector::new(&ctx, &creds, "/v1/things").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    for _ in 0..5 {
        let tx = tx.clone();
        let req = RequestDescriptor::builder(Method::GET)
            .on_complete(move |resp, _| {
                let _ = tx.send(resp.success);
            })
            .build();
        assert!(connector.send(req));
    }
    for _ in 0..5 {
        let ok = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("completion missing")
            .unwrap();
        assert!(ok);
    }
    iam.assert_async().await;
    service.assert_async().await;
}

#[tokio::test]
async fn test_refresh_failure_is_network_error_and_request_not_sent() {
    let mut fixture = MockServerFixture::new().await;
    let _iam = fixture
        .server
        .mock("POST", "/identity/token")
        .with_status(400)
        .with_body(r#"{"errorCode":"BXNIM0415E","errorMessage":"Provided API key could not be found"}"#)
        .create_async()
        .await;
    let service = fixture
        .server
        .mock("GET", "/api/v1/things")
        .expect(0)
        .create_async()
        .await;

    let creds = Credentials::iam_api_key("bad-key")
        .with_iam_url(fixture.iam_url())
        .with_url(fixture.service_url());
    let ctx = context();
    let connector = Connector::new(&ctx, &creds, "/v1/things").unwrap();

    let resp = call(&connector).await;
    assert!(!resp.success);
    assert_eq!(resp.status_code, 0);
    assert_eq!(resp.error.as_ref().map(|e| e.kind()), Some(ErrorKind::Network));
    service.assert_async().await;
}

#[tokio::test]
async fn test_expired_token_without_refresh_path_fails() {
    let fixture = MockServerFixture::new().await;
    let token = IamToken::new("stale").with_expiry(Utc::now() - ChronoDuration::minutes(5));
    let creds = Credentials::iam_token(token)
        .with_iam_url(fixture.iam_url())
        .with_url(fixture.service_url());
    let ctx = context();
    let connector = Connector::new(&ctx, &creds, "/v1/things").unwrap();

    let resp = call(&connector).await;
    assert_eq!(resp.error.as_ref().map(|e| e.kind()), Some(ErrorKind::Network));
}
