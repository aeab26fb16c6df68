use std::sync::Arc;
use std::time::Duration;

use client::ClientError;
use reqwest::StatusCode;
use serde_json::json;

use test_helpers::{
    RecordingNotifier, assert_status_code, mock, ok_envelope, spawn_app,
};
use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh()
-> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();

    // first attempts with the stale token are refused
    Mock::given(method("GET"))
        .and(path("/api/valuations"))
        .and(bearer_token("T1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&app.server)
        .await;
    // replays with the refreshed token succeed
    Mock::given(method("GET"))
        .and(path("/api/valuations"))
        .and(bearer_token("T2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok_envelope(json!([]))),
        )
        .expect(3)
        .mount(&app.server)
        .await;
    // the delay holds the refresh window open while all three requests
    // observe their 401s; expect(1) pins the single-flight invariant
    app.mount_refresh("T2", Some(Duration::from_millis(100))).await;

    let identity = app.identity();
    let (a, b, c) = tokio::join!(
        app.client.list_valuations(&identity, None),
        app.client.list_valuations(&identity, None),
        app.client.list_valuations(&identity, None),
    );
    assert!(a?.is_empty());
    assert!(b?.is_empty());
    assert!(c?.is_empty());

    // the rotated token was persisted; the refresh token is unchanged
    let session = app.client.session().unwrap();
    assert_eq!(session.token, "T2");
    assert_eq!(session.refresh_token, "R1");

    Ok(())
}

#[tokio::test]
async fn second_unauthorized_after_retry_is_terminal() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();
    let notifier = Arc::new(RecordingNotifier::default());
    app.client.set_unauthorized_notifier(notifier.clone());

    // the backend refuses the old and the refreshed token alike
    Mock::given(method("GET"))
        .and(path("/api/valuations"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&app.server)
        .await;
    app.mount_refresh("T2", Some(Duration::from_millis(100))).await;

    let identity = app.identity();
    let (a, b) = tokio::join!(
        app.client.list_valuations(&identity, None),
        app.client.list_valuations(&identity, None),
    );
    assert!(matches!(a, Err(ClientError::SessionExpired)));
    assert!(matches!(b, Err(ClientError::SessionExpired)));

    // the session is gone and the user heard about it exactly once
    assert!(app.client.session().is_none());
    assert_eq!(notifier.count(), 1);

    Ok(())
}

#[tokio::test]
async fn refresh_failure_rejects_the_whole_queue() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();
    let notifier = Arc::new(RecordingNotifier::default());
    app.client.set_unauthorized_notifier(notifier.clone());

    Mock::given(method("GET"))
        .and(path("/api/valuations"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&app.server)
        .await;
    app.mount_failing_refresh().await;

    let identity = app.identity();
    let (a, b) = tokio::join!(
        app.client.list_valuations(&identity, None),
        app.client.list_valuations(&identity, None),
    );
    assert!(matches!(a, Err(ClientError::SessionExpired)));
    assert!(matches!(b, Err(ClientError::SessionExpired)));
    assert!(app.client.session().is_none());
    assert_eq!(notifier.count(), 1);

    Ok(())
}

#[tokio::test]
async fn non_401_errors_pass_through_untouched() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();

    Mock::given(method("GET"))
        .and(path("/api/valuations"))
        .respond_with(
            ResponseTemplate::new(500).set_body_string("database on fire"),
        )
        .mount(&app.server)
        .await;

    let result = app.client.list_valuations(&app.identity(), None).await;
    match result {
        Err(ClientError::Api(code, text)) => {
            assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(text, "database on fire");
        }
        other => panic!("Expected an API error, got {other:?}"),
    }

    // no refresh was attempted
    let requests = app.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    Ok(())
}

#[tokio::test]
async fn unauthorized_without_session_passes_through() -> anyhow::Result<()> {
    let app = spawn_app().await;

    Mock::given(method("GET"))
        .and(path("/api/valuations"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&app.server)
        .await;

    let identity = mock::session().identity();
    let result = app.client.list_valuations(&identity, None).await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    // an unauthenticated request never enters the refresh protocol
    let requests = app.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    Ok(())
}
