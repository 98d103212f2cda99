mod common;

use common::{configured_client, release_json, token_client};
use discogs_core::prelude::*;
use discogs_test_support::{MockReply, assert_request, json_bytes, mock};
use http::Method;
use std::time::Duration;

#[tokio::test]
async fn token_client_sends_identity_and_token_headers() {
    let (client, handle) = token_client([MockReply::ok_json(json_bytes(&release_json(1, "T")))]);

    client.get("/releases/1", None).await.unwrap();

    let recorded = handle.recorded();
    assert_request(&recorded[0])
        .method(Method::GET)
        .path("/releases/1")
        .header("authorization", "Discogs token=test-token")
        .header("accept", "application/json")
        .header_starts_with("user-agent", "discogs_core/")
        .no_body();
    handle.finish();
}

#[tokio::test]
async fn consumer_pair_without_access_token_uses_key_secret_header() {
    let (transport, handle) = mock()
        .reply(MockReply::ok_json(json_bytes(&release_json(1, "T"))))
        .build();
    let client = Discogs::builder()
        .env_fallback(false)
        .consumer_key("ck")
        .consumer_secret("cs")
        .build_with_transport(transport)
        .unwrap();

    client.get("/releases/1", None).await.unwrap();

    assert_request(&handle.recorded()[0]).header("authorization", "Discogs key=ck, secret=cs");
    handle.finish();
}

#[tokio::test]
async fn full_oauth_signs_each_request_with_a_fresh_nonce() {
    let (transport, handle) = mock()
        .replies([
            MockReply::ok_json(json_bytes(&release_json(1, "A"))),
            MockReply::ok_json(json_bytes(&release_json(2, "B"))),
        ])
        .build();
    let client = Discogs::builder()
        .env_fallback(false)
        .consumer_key("ck")
        .consumer_secret("cs")
        .access_token("at")
        .access_token_secret("ats")
        .build_with_transport(transport)
        .unwrap();

    client.get("/releases/1", None).await.unwrap();
    client.get("/releases/2", None).await.unwrap();

    let recorded = handle.recorded();
    let first = recorded[0].headers["authorization"].to_str().unwrap().to_owned();
    let second = recorded[1].headers["authorization"].to_str().unwrap().to_owned();
    for header in [&first, &second] {
        assert!(header.starts_with("OAuth "), "got: {header}");
        assert!(header.contains(r#"oauth_consumer_key="ck""#));
        assert!(header.contains(r#"oauth_signature="cs%26ats""#));
        assert!(header.contains(r#"oauth_signature_method="PLAINTEXT""#));
        assert!(header.contains(r#"oauth_token="at""#));
    }
    assert_ne!(first, second, "nonce/timestamp must differ per request");
    handle.finish();
}

#[tokio::test]
async fn plain_token_outranks_full_oauth() {
    let (transport, handle) = mock()
        .reply(MockReply::ok_json(json_bytes(&release_json(1, "T"))))
        .build();
    let client = Discogs::builder()
        .env_fallback(false)
        .token("tk")
        .consumer_key("ck")
        .consumer_secret("cs")
        .access_token("at")
        .access_token_secret("ats")
        .build_with_transport(transport)
        .unwrap();

    client.get("/releases/1", None).await.unwrap();

    assert_request(&handle.recorded()[0]).header("authorization", "Discogs token=tk");
    handle.finish();
}

#[tokio::test]
async fn unauthenticated_client_sends_no_authorization() {
    let (transport, handle) = mock()
        .reply(MockReply::ok_json(json_bytes(&release_json(1, "T"))))
        .build();
    let client = Discogs::builder()
        .env_fallback(false)
        .build_with_transport(transport)
        .unwrap();

    client.get("/releases/1", None).await.unwrap();

    assert_request(&handle.recorded()[0])
        .no_header("authorization")
        .header("accept", "application/json");
    handle.finish();
}

#[tokio::test]
async fn custom_user_agent_replaces_the_default() {
    let (client, handle) = configured_client(
        [MockReply::ok_json(json_bytes(&release_json(1, "T")))],
        |b| b.user_agent("my-app/2.1 +https://example.com"),
    );

    client.get("/releases/1", None).await.unwrap();

    assert_request(&handle.recorded()[0])
        .header("user-agent", "my-app/2.1 +https://example.com");
    handle.finish();
}

#[tokio::test]
async fn per_attempt_timeout_reaches_the_transport() {
    let (client, handle) = configured_client(
        [MockReply::ok_json(json_bytes(&release_json(1, "T")))],
        |b| b.timeout(Duration::from_secs(7)),
    );

    client.get("/releases/1", None).await.unwrap();

    assert_eq!(
        handle.recorded()[0].timeout,
        Some(Duration::from_secs(7))
    );
    handle.finish();
}
