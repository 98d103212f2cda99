#![allow(dead_code)]

use discogs_core::prelude::*;
use discogs_test_support::{MockHandle, MockReply, MockTransport, mock};

/// Token-authenticated client over a scripted transport. Environment
/// fallback is off so host `DISCOGS_*` variables cannot leak into tests.
pub fn token_client(
    replies: impl IntoIterator<Item = MockReply>,
) -> (Discogs<MockTransport>, MockHandle) {
    configured_client(replies, |b| b)
}

pub fn configured_client(
    replies: impl IntoIterator<Item = MockReply>,
    configure: impl FnOnce(DiscogsBuilder) -> DiscogsBuilder,
) -> (Discogs<MockTransport>, MockHandle) {
    let (transport, handle) = mock().replies(replies).build();
    let builder = configure(Discogs::builder().env_fallback(false).token("test-token"));
    let client = builder
        .build_with_transport(transport)
        .expect("client builds");
    (client, handle)
}

pub fn release_json(id: u64, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "artists": [{"id": 1, "name": "Some Artist"}],
        "year": 1994
    })
}
