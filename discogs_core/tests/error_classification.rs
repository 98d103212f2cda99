mod common;

use common::token_client;
use discogs_core::prelude::*;
use discogs_test_support::{MockReply, json_bytes};
use http::StatusCode;
use serde_json::json;

async fn fail_with(status: StatusCode, body: serde_json::Value) -> DiscogsError {
    let (client, handle) = token_client([MockReply::status_json(status, json_bytes(&body))]);
    let err = client.get("/releases/1", None).await.unwrap_err();
    handle.finish();
    err
}

#[tokio::test]
async fn unauthorized_maps_to_authentication() {
    let err = fail_with(
        StatusCode::UNAUTHORIZED,
        json!({"message": "You must authenticate to access this resource."}),
    )
    .await;
    match err {
        DiscogsError::Authentication { message, body } => {
            assert_eq!(message, "You must authenticate to access this resource.");
            assert!(matches!(body, ErrorBody::Json(_)));
        }
        other => panic!("expected Authentication, got {other:?}"),
    }
}

#[tokio::test]
async fn forbidden_and_not_found_and_validation() {
    assert!(matches!(
        fail_with(StatusCode::FORBIDDEN, json!({"message": "no"})).await,
        DiscogsError::Forbidden { .. }
    ));
    assert!(matches!(
        fail_with(StatusCode::NOT_FOUND, json!({"message": "gone"})).await,
        DiscogsError::NotFound { .. }
    ));
    assert!(matches!(
        fail_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"message": "bad", "detail": {"rating": "out of range"}})
        )
        .await,
        DiscogsError::Validation { .. }
    ));
}

#[tokio::test]
async fn unmapped_statuses_fall_back_to_api_with_status_attached() {
    let err = fail_with(StatusCode::IM_A_TEAPOT, json!({"message": "short and stout"})).await;
    match &err {
        DiscogsError::Api { status, message, .. } => {
            assert_eq!(*status, StatusCode::IM_A_TEAPOT);
            assert_eq!(message, "short and stout");
        }
        other => panic!("expected Api, got {other:?}"),
    }
    assert_eq!(err.status(), Some(StatusCode::IM_A_TEAPOT));
}

#[tokio::test]
async fn status_accessor_covers_the_http_taxonomy() {
    let err = fail_with(StatusCode::UNAUTHORIZED, json!({})).await;
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

    let err = fail_with(StatusCode::NOT_FOUND, json!({})).await;
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

    assert_eq!(
        DiscogsError::Configuration("missing credentials").status(),
        None
    );
}

#[tokio::test]
async fn body_without_message_field_still_yields_text() {
    let err = fail_with(StatusCode::NOT_FOUND, json!({"detail": "nope"})).await;
    match err {
        DiscogsError::NotFound { message, .. } => {
            // Falls back to the serialized body.
            assert!(message.contains("nope"), "got: {message}");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn decode_error_carries_a_body_preview() {
    let (client, handle) = token_client([MockReply::ok_json(bytes::Bytes::from_static(
        b"<html>not json</html>",
    ))]);

    let resp = client.get("/releases/1", None).await.unwrap();
    let err = resp.json::<Release>().unwrap_err();
    match err {
        DiscogsError::Decode { body, .. } => assert!(body.contains("not json"), "got: {body}"),
        other => panic!("expected Decode, got {other:?}"),
    }
    handle.finish();
}
