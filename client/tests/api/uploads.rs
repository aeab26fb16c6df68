use serde_json::json;

use client::uploads::{
    Asset, AssetCategory, Passthrough, folder_path, upload_assets,
};
use payloads::MAX_IMAGE_SIZE;
use test_helpers::{FailOn, mock, spawn_app};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn one_failed_compression_drops_only_that_asset() -> anyhow::Result<()>
{
    let app = spawn_app().await;
    app.seed_session();
    let id = mock::valuation_id();

    Mock::given(method("POST"))
        .and(path("/api/images/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "images": [{ "url": "https://cdn.example.com/u.jpg" }] }),
        ))
        .expect(2)
        .mount(&app.server)
        .await;

    let assets = vec![
        Asset::pending("a.jpg", vec![1, 2, 3]),
        Asset::pending("b.jpg", vec![4, 5, 6]),
        Asset::pending("c.jpg", vec![7, 8, 9]),
    ];
    let uploaded = upload_assets(
        &app.client,
        &id,
        AssetCategory::PropertyImages,
        None,
        &assets,
        &FailOn("b.jpg"),
    )
    .await;

    assert_eq!(uploaded.len(), 2);

    Ok(())
}

#[tokio::test]
async fn persisted_entries_are_skipped_and_merged_in_order()
-> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();
    let id = mock::valuation_id();

    Mock::given(method("POST"))
        .and(path("/api/images/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "images": [{ "url": "https://cdn.example.com/new.jpg" }] }),
        ))
        .expect(1)
        .mount(&app.server)
        .await;

    let assets = vec![
        Asset::persisted("https://cdn.example.com/old.jpg"),
        Asset::pending("new.jpg", vec![1]),
    ];
    let uploaded = upload_assets(
        &app.client,
        &id,
        AssetCategory::LocationImages,
        None,
        &assets,
        &Passthrough,
    )
    .await;

    assert_eq!(uploaded.len(), 2);
    assert_eq!(uploaded[0].url, "https://cdn.example.com/old.jpg");
    assert_eq!(uploaded[1].url, "https://cdn.example.com/new.jpg");

    Ok(())
}

#[tokio::test]
async fn a_failed_upload_does_not_abort_its_siblings() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();
    let id = mock::valuation_id();

    // the mock for the broken asset is mounted first so it wins the match
    Mock::given(method("POST"))
        .and(path("/api/images/upload"))
        .and(body_string_contains("broken.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/images/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "images": [{ "url": "https://cdn.example.com/ok.jpg" }] }),
        ))
        .expect(1)
        .mount(&app.server)
        .await;

    let assets = vec![
        Asset::pending("broken.jpg", vec![1]),
        Asset::pending("fine.jpg", vec![2]),
    ];
    let uploaded = upload_assets(
        &app.client,
        &id,
        AssetCategory::PropertyImages,
        None,
        &assets,
        &Passthrough,
    )
    .await;

    assert_eq!(uploaded.len(), 1);
    assert_eq!(uploaded[0].url, "https://cdn.example.com/ok.jpg");

    Ok(())
}

#[tokio::test]
async fn uploads_are_tagged_with_their_folder_path() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();
    let id = mock::valuation_id();
    let folder = folder_path(&id, AssetCategory::AreaImages, Some("Kitchen"));

    Mock::given(method("POST"))
        .and(path("/api/images/upload"))
        .and(body_string_contains(folder.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "images": [{ "url": "https://cdn.example.com/k.jpg" }] }),
        ))
        .expect(1)
        .mount(&app.server)
        .await;

    let assets = vec![Asset::pending("kitchen.jpg", vec![1])];
    let uploaded = upload_assets(
        &app.client,
        &id,
        AssetCategory::AreaImages,
        Some("Kitchen"),
        &assets,
        &Passthrough,
    )
    .await;
    assert_eq!(uploaded.len(), 1);

    // the multipart body carries the file part and the folder tag
    let requests = app.server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).into_owned();
    assert!(body.contains("name=\"images\""));
    assert!(body.contains("kitchen.jpg"));
    assert!(body.contains(&format!("valuations/{id}/area-images/kitchen")));

    Ok(())
}

#[tokio::test]
async fn documents_use_their_own_endpoint() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();
    let id = mock::valuation_id();

    Mock::given(method("POST"))
        .and(path("/api/documents/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "documents": [{ "url": "https://cdn.example.com/d.pdf" }] }),
        ))
        .expect(1)
        .mount(&app.server)
        .await;

    let assets = vec![Asset::pending("deed.pdf", vec![1, 2])];
    let uploaded = upload_assets(
        &app.client,
        &id,
        AssetCategory::Documents,
        None,
        &assets,
        &Passthrough,
    )
    .await;
    assert_eq!(uploaded[0].url, "https://cdn.example.com/d.pdf");

    Ok(())
}

#[tokio::test]
async fn oversized_assets_never_reach_the_network() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.seed_session();
    let id = mock::valuation_id();

    let assets =
        vec![Asset::pending("huge.jpg", vec![0u8; MAX_IMAGE_SIZE + 1])];
    let uploaded = upload_assets(
        &app.client,
        &id,
        AssetCategory::PropertyImages,
        None,
        &assets,
        &Passthrough,
    )
    .await;

    assert!(uploaded.is_empty());
    assert!(app.server.received_requests().await.unwrap().is_empty());

    Ok(())
}
