//! Response snapshots as stored in and served from partitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status that is allowed to be written to a partition.
pub const COMPLETE_STATUS: u16 = 200;

/// Status of the synthetic response served when neither cache nor network answers.
pub const OFFLINE_STATUS: u16 = 503;

/// Body of the synthetic offline response.
pub const OFFLINE_BODY: &str = "Offline";

/// A full response snapshot: status line, headers and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CachedResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, status_text: String::new(), headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The plain-text 503 served when a request can be answered by neither cache nor network.
    pub fn offline() -> Self {
        Self {
            status: OFFLINE_STATUS,
            status_text: "Service Unavailable".into(),
            headers: vec![("content-type".into(), "text/plain".into())],
            body: OFFLINE_BODY.as_bytes().to_vec(),
        }
    }

    /// Only a 200 is a complete success. 206 and other 2xx codes do not qualify.
    pub fn is_complete(&self) -> bool {
        self.status == COMPLETE_STATUS
    }

    pub fn is_offline(&self) -> bool {
        self.status == OFFLINE_STATUS && self.body == OFFLINE_BODY.as_bytes()
    }

    /// Case-insensitive header lookup; returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
