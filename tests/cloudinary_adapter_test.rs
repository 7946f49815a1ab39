mod common;

use common::media_config;
use httpmock::prelude::*;
use profile_image_service::core::data_uri;
use profile_image_service::core::{DeleteOutcome, MediaHost};
use profile_image_service::{CloudinaryClient, ServiceError};

#[tokio::test]
async fn test_upload_sends_signed_data_uri() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1_1/demo/image/upload")
                .header("content-type", "application/x-www-form-urlencoded")
                // data:image/png;base64,aGk=
                .body_contains("file=data%3Aimage%2Fpng%3Bbase64%2CaGk%3D")
                .body_contains("folder=avatars")
                .body_contains("timestamp=");
            then.status(200).json_body(serde_json::json!({
                "public_id": "avatars/x1",
                "secure_url": "https://res.cloudinary.com/demo/image/upload/v9/avatars/x1.png"
            }));
        })
        .await;

    let client = CloudinaryClient::new(&media_config(server.base_url())).unwrap();
    let asset = client
        .upload(&data_uri::encode("image/png", b"hi"), "avatars")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(asset.public_id, "avatars/x1");
    assert!(asset.secure_url.ends_with("/avatars/x1.png"));
}

#[tokio::test]
async fn test_upload_error_carries_host_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1_1/demo/image/upload");
            then.status(400)
                .json_body(serde_json::json!({"error": {"message": "Invalid image file"}}));
        })
        .await;

    let client = CloudinaryClient::new(&media_config(server.base_url())).unwrap();
    let err = client
        .upload("data:image/png;base64,", "profile-images")
        .await
        .unwrap_err();

    match err {
        ServiceError::UpstreamError { message } => {
            assert!(message.contains("Invalid image file"), "{}", message)
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_destroy_outcomes() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1_1/demo/image/destroy")
                .body_contains("public_id=profile-images%2Fgone");
            then.status(200)
                .json_body(serde_json::json!({"result": "not found"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1_1/demo/image/destroy")
                .body_contains("public_id=profile-images%2Fabc123");
            then.status(200).json_body(serde_json::json!({"result": "ok"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1_1/demo/image/destroy")
                .body_contains("public_id=profile-images%2Fbroken");
            then.status(502);
        })
        .await;

    let client = CloudinaryClient::new(&media_config(server.base_url())).unwrap();

    assert_eq!(
        client.destroy("profile-images/abc123").await,
        DeleteOutcome::Deleted
    );
    assert_eq!(
        client.destroy("profile-images/gone").await,
        DeleteOutcome::NotFound
    );
    assert!(matches!(
        client.destroy("profile-images/broken").await,
        DeleteOutcome::Failed(_)
    ));
}

#[tokio::test]
async fn test_destroy_against_unreachable_host_is_failed_not_error() {
    // nothing listens on port 9 (discard) in the test environment
    let client = CloudinaryClient::new(&media_config("http://127.0.0.1:9".to_string())).unwrap();
    assert!(matches!(
        client.destroy("profile-images/abc123").await,
        DeleteOutcome::Failed(_)
    ));
}
