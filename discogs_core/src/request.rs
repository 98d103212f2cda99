use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

use crate::error::{DiscogsError, body_preview};

/// Per-call payload handed to [`Discogs::send`](crate::prelude::Discogs::send).
/// Query parameters use a sorted map so logically identical requests always
/// serialize (and cache-key) identically.
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub json: Option<serde_json::Value>,
    pub params: Option<BTreeMap<String, String>>,
    pub file: Option<FileUpload>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, json: serde_json::Value) -> Self {
        self.json = Some(json);
        self
    }

    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_file(mut self, file: FileUpload) -> Self {
        self.file = Some(file);
        self
    }
}

/// A multipart file payload. Encoded locally into the final wire bytes so
/// the transport seam stays a plain body.
#[derive(Clone, Debug)]
pub struct FileUpload {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl FileUpload {
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// multipart/form-data encoding with the given boundary.
    pub(crate) fn encode(&self, boundary: &str) -> Bytes {
        let mut out = Vec::with_capacity(self.bytes.len() + 256);
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        out.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                self.field, self.file_name
            )
            .as_bytes(),
        );
        out.extend_from_slice(format!("Content-Type: {}\r\n\r\n", self.content_type).as_bytes());
        out.extend_from_slice(&self.bytes);
        out.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        Bytes::from(out)
    }
}

pub(crate) fn multipart_boundary() -> String {
    let bytes: [u8; 16] = rand::random();
    let mut out = String::with_capacity(16 + 32);
    out.push_str("discogs-boundary-");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Final response surfaced to facades: status, headers, decoded body bytes.
/// Cache hits synthesize one of these without touching the network.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, DiscogsError> {
        serde_json::from_slice(&self.body).map_err(|source| DiscogsError::Decode {
            source,
            body: body_preview(&self.headers, &self.body),
        })
    }
}
