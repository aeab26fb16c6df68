use serde_json::json;

use test_helpers::{mock, ok_envelope, spawn_app};
use wiremock::matchers::{bearer_token, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn get_requests_carry_bearer_and_identity_scoping()
-> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();

    // the mock only matches when the token and all three identity fields
    // made it onto the request
    Mock::given(method("GET"))
        .and(path("/api/valuations"))
        .and(bearer_token(mock::ACCESS_TOKEN))
        .and(query_param("username", mock::USERNAME))
        .and(query_param("role", "valuer"))
        .and(query_param("clientId", mock::CLIENT_ID))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok_envelope(json!([]))),
        )
        .expect(1)
        .mount(&app.server)
        .await;

    let rows = app.client.list_valuations(&app.identity(), None).await?;
    assert!(rows.is_empty());

    Ok(())
}

#[tokio::test]
async fn absent_session_sends_no_credentials() -> anyhow::Result<()> {
    let app = spawn_app().await;

    Mock::given(method("GET"))
        .and(path("/api/valuations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok_envelope(json!([]))),
        )
        .mount(&app.server)
        .await;

    // the caller still names an identity; without a stored session the
    // request goes out bare
    let identity = mock::session().identity();
    app.client.list_valuations(&identity, None).await?;

    let requests = app.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
    let query = requests[0].url.query().unwrap_or("");
    assert!(!query.contains("username"));

    Ok(())
}

#[tokio::test]
async fn login_stores_the_session_and_logout_clears_it()
-> anyhow::Result<()> {
    let app = spawn_app().await;

    let session = app.login_asha().await?;
    assert_eq!(session.token, mock::ACCESS_TOKEN);
    assert_eq!(
        app.client.session().unwrap().refresh_token,
        mock::REFRESH_TOKEN
    );

    // populate a cache entry so logout has something to drop
    Mock::given(method("GET"))
        .and(path("/api/valuations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok_envelope(json!([]))),
        )
        .mount(&app.server)
        .await;
    app.client.list_valuations(&session.identity(), None).await?;
    assert_eq!(app.client.cache().len(), 1);

    app.client.logout();
    assert!(app.client.session().is_none());
    assert!(app.client.cache().is_empty());

    Ok(())
}
