mod common;

use common::{configured_client, release_json};
use discogs_core::prelude::*;
use discogs_test_support::{MockReply, json_bytes};
use http::StatusCode;
use http::header::RETRY_AFTER;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn transient_statuses_are_retried_until_success() {
    let (client, handle) = configured_client(
        [
            MockReply::status(StatusCode::INTERNAL_SERVER_ERROR),
            MockReply::status(StatusCode::BAD_GATEWAY),
            MockReply::ok_json(json_bytes(&release_json(1, "Recovered"))),
        ],
        |b| b.max_retries(2),
    );

    let resp = client.get("/releases/1", None).await.unwrap();
    assert_eq!(resp.json::<Release>().unwrap().title, "Recovered");
    handle.assert_recorded_len(3);
    handle.finish();
}

#[tokio::test(start_paused = true)]
async fn zero_retries_surfaces_rate_limit_with_hint_after_one_call() {
    let (client, handle) = configured_client(
        [
            MockReply::status_json(
                StatusCode::TOO_MANY_REQUESTS,
                json_bytes(&serde_json::json!({"message": "slow down"})),
            )
            .with_header(RETRY_AFTER, http::HeaderValue::from_static("10")),
        ],
        |b| b.max_retries(0),
    );

    let err = client.get("/releases/1", None).await.unwrap_err();
    match err {
        DiscogsError::RateLimit {
            message,
            retry_after,
            ..
        } => {
            assert_eq!(message, "slow down");
            assert_eq!(retry_after, Some(10.0));
        }
        other => panic!("expected RateLimit, got {other:?}"),
    }
    handle.assert_recorded_len(1);
    handle.finish();
}

#[tokio::test(start_paused = true)]
async fn non_retryable_status_fails_immediately_despite_budget() {
    let (client, handle) = configured_client(
        [MockReply::status_json(
            StatusCode::NOT_FOUND,
            json_bytes(&serde_json::json!({"message": "Release not found."})),
        )],
        |b| b.max_retries(3),
    );

    let err = client.get("/releases/404", None).await.unwrap_err();
    assert!(matches!(err, DiscogsError::NotFound { .. }), "got {err:?}");
    handle.assert_recorded_len(1);
    handle.finish();
}

#[tokio::test(start_paused = true)]
async fn connection_errors_are_retried() {
    let (client, handle) = configured_client(
        [
            MockReply::connect_error("connection refused"),
            MockReply::ok_json(json_bytes(&release_json(1, "T"))),
        ],
        |b| b.max_retries(1),
    );

    client.get("/releases/1", None).await.unwrap();
    handle.assert_recorded_len(2);
    handle.finish();
}

#[tokio::test(start_paused = true)]
async fn connection_error_with_zero_retries_is_terminal() {
    let (client, handle) = configured_client(
        [MockReply::timeout_error("deadline exceeded")],
        |b| b.max_retries(0),
    );

    let err = client.get("/releases/1", None).await.unwrap_err();
    assert!(matches!(err, DiscogsError::Connection(_)), "got {err:?}");
    handle.assert_recorded_len(1);
    handle.finish();
}

#[tokio::test(start_paused = true)]
async fn exhausted_budget_surfaces_the_last_status() {
    let (client, handle) = configured_client(
        [
            MockReply::status(StatusCode::INTERNAL_SERVER_ERROR),
            MockReply::status(StatusCode::SERVICE_UNAVAILABLE),
        ],
        |b| b.max_retries(1),
    );

    let err = client.get("/releases/1", None).await.unwrap_err();
    match err {
        DiscogsError::Api { status, .. } => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE)
        }
        other => panic!("expected Api, got {other:?}"),
    }
    handle.assert_recorded_len(2);
    handle.finish();
}

// Paused-clock tests: tokio::time::sleep advances virtual time instantly, so
// the waits below measure the scheduled delay, not wall time.

#[tokio::test(start_paused = true)]
async fn numeric_retry_after_header_sets_the_wait_verbatim() {
    let (client, handle) = configured_client(
        [
            MockReply::status(StatusCode::TOO_MANY_REQUESTS)
                .with_header(RETRY_AFTER, http::HeaderValue::from_static("7")),
            MockReply::ok_json(json_bytes(&release_json(1, "T"))),
        ],
        |b| b.max_retries(1),
    );

    let started = tokio::time::Instant::now();
    client.get("/releases/1", None).await.unwrap();
    let waited = started.elapsed();
    assert!(
        waited >= Duration::from_secs(7) && waited < Duration::from_secs(8),
        "waited {waited:?}"
    );
    handle.finish();
}

#[tokio::test(start_paused = true)]
async fn backoff_without_a_hint_is_exponential_with_jitter() {
    let (client, handle) = configured_client(
        [
            MockReply::status(StatusCode::INTERNAL_SERVER_ERROR),
            MockReply::status(StatusCode::INTERNAL_SERVER_ERROR),
            MockReply::ok_json(json_bytes(&release_json(1, "T"))),
        ],
        |b| b.max_retries(2),
    );

    let started = tokio::time::Instant::now();
    client.get("/releases/1", None).await.unwrap();
    let waited = started.elapsed();
    // 2^0 + 2^1 plus up to a second of jitter on each wait.
    assert!(
        waited >= Duration::from_secs(3) && waited < Duration::from_secs(5),
        "waited {waited:?}"
    );
    handle.finish();
}
