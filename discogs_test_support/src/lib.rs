//! Scripted-transport test support for `discogs_core`.
//!
//! [`mock::MockTransport`] records every request and answers from a fixed
//! reply queue; [`assert::assert_request`] gives fluent assertions over the
//! recording. Dropping a [`mock::MockHandle`] with unconsumed replies panics,
//! so a test that forgets half its script fails loudly.

pub mod assert;
pub mod mock;

pub use assert::{RequestAssert, assert_request};
pub use mock::{MockBuilder, MockHandle, MockReply, MockTransport, RecordedRequest, json_bytes, mock};
