mod auth;
mod form;
mod refresh;
mod uploads;

use serde_json::json;
use test_helpers::{mock, ok_envelope, spawn_app};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn listing_round_trips_through_the_client() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();

    let summary = mock::summary(mock::valuation_id());
    Mock::given(method("GET"))
        .and(path("/api/valuations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(
            json!([serde_json::to_value(&summary)?]),
        )))
        .mount(&app.server)
        .await;

    let rows = app.client.list_valuations(&app.identity(), None).await?;
    assert_eq!(rows, vec![summary]);

    Ok(())
}
