use std::sync::Arc;

use rust_decimal::dec;
use serde_json::json;

use client::form::{AreaSection, ValuationForm};
use client::uploads::Asset;
use payloads::ValuationStatus;
use test_helpers::{
    FailOn, assert_validation_error, mock, ok_envelope, spawn_app,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn filled_form() -> ValuationForm {
    let mut form = ValuationForm::new();
    form.client_info = mock::client_info();
    form.location = mock::location_info();
    form.construction = mock::construction_info();
    form.land_area_sqm = dec!(120.5);
    form.land_rate_per_sqm = dec!(1000);
    form.building_area_sqm = dec!(80);
    form.building_rate_per_sqm = dec!(1500.50);
    form
}

#[tokio::test]
async fn save_creates_the_record_then_uploads_and_updates()
-> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();
    let id = mock::valuation_id();

    // creation happens first so uploads have a record id for their
    // folder paths
    Mock::given(method("POST"))
        .and(path("/api/valuations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(
            serde_json::to_value(mock::valuation(id))?,
        )))
        .expect(1)
        .mount(&app.server)
        .await;
    // one property image survives compression, plus the kitchen image
    Mock::given(method("POST"))
        .and(path("/api/images/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "images": [{ "url": "https://cdn.example.com/u.jpg" }] }),
        ))
        .expect(2)
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/documents/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "documents": [{ "url": "https://cdn.example.com/d.pdf" }] }),
        ))
        .expect(1)
        .mount(&app.server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/api/valuations/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(
            serde_json::to_value(mock::valuation(id))?,
        )))
        .expect(1)
        .mount(&app.server)
        .await;

    let mut form = filled_form().with_processor(Arc::new(FailOn("bad.jpg")));
    form.property_images = vec![
        Asset::pending("front.jpg", vec![1, 2]),
        Asset::pending("bad.jpg", vec![3, 4]),
    ];
    form.areas = vec![AreaSection {
        name: "Kitchen".into(),
        length_m: dec!(4),
        width_m: dec!(3),
        images: vec![Asset::pending("kitchen.jpg", vec![5])],
    }];
    form.documents = vec![Asset::pending("deed.pdf", vec![6])];

    let outcome = form.save(&app.client).await?;

    assert_eq!(outcome.dropped_assets, 1);
    assert_eq!(form.id, Some(id));
    assert!(form.property_images.iter().all(|a| !a.is_pending()));
    assert!(form.areas[0].images.iter().all(|a| !a.is_pending()));
    assert!(form.documents.iter().all(|a| !a.is_pending()));

    Ok(())
}

#[tokio::test]
async fn an_invalid_form_never_reaches_the_network() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();

    let mut form = filled_form();
    form.client_info.applicant_name = String::new();

    assert_validation_error(
        form.save(&app.client).await,
        "This field is required",
    );
    assert!(app.server.received_requests().await.unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn saving_signed_out_is_refused() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let mut form = filled_form();
    assert_validation_error(
        form.save(&app.client).await,
        "You are not signed in",
    );
    assert!(app.server.received_requests().await.unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn submit_for_review_moves_the_status_along() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();
    let id = mock::valuation_id();

    let mut submitted = mock::valuation(id);
    submitted.status = ValuationStatus::OnProgress;
    Mock::given(method("PUT"))
        .and(path(format!("/api/valuations/{id}")))
        .and(body_partial_json(json!({ "status": "on-progress" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(
            serde_json::to_value(&submitted)?,
        )))
        .expect(1)
        .mount(&app.server)
        .await;

    let mut form = filled_form();
    form.id = Some(id);
    form.submit_for_review(&app.client).await?;
    assert_eq!(form.status, ValuationStatus::OnProgress);

    Ok(())
}

#[tokio::test]
async fn manager_actions_require_a_saved_record() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();

    let mut form = filled_form();
    assert_validation_error(
        form.reject(&app.client, "blurry photos").await,
        "The valuation has not been saved yet",
    );

    Ok(())
}

#[tokio::test]
async fn rejection_through_the_form_carries_feedback() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();
    let id = mock::valuation_id();

    let mut form = filled_form();
    form.id = Some(id);

    assert_validation_error(
        form.reject(&app.client, "  ").await,
        "Feedback is required",
    );

    let mut rejected = mock::valuation(id);
    rejected.status = ValuationStatus::Rejected;
    rejected.feedback = Some("blurry photos".into());
    Mock::given(method("POST"))
        .and(path(format!("/api/valuations/{id}/manager-submit")))
        .and(body_partial_json(json!({
            "action": "rejected",
            "feedback": "blurry photos",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(
            serde_json::to_value(&rejected)?,
        )))
        .expect(1)
        .mount(&app.server)
        .await;

    form.reject(&app.client, "blurry photos").await?;
    assert_eq!(form.status, ValuationStatus::Rejected);

    Ok(())
}
