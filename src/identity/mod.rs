//! Request correlation identifiers carried into formatted events and stream names.

use serde::{Deserialize, Serialize};
use std::env;
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub const CORRELATION_ID_ENV: &str = "CORRELATION_ID";
pub const REQUEST_ID_ENV: &str = "REQUEST_ID";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestIdentity {
    correlation_id: String,
    request_id: String,
    parent_id: String,
}

impl RequestIdentity {
    pub fn new(
        correlation_id: impl Into<String>,
        request_id: impl Into<String>,
        parent_id: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            request_id: request_id.into(),
            parent_id: parent_id.into(),
        }
    }

    /// Identity for a process with no upstream caller.
    pub fn generate() -> Self {
        Self::from_headers(std::iter::empty::<(&str, String)>())
    }

    /// Derives the identity of the current request from incoming headers.
    ///
    /// The request id is always new. The caller's request id becomes our parent,
    /// and its correlation id is inherited, falling back to our own request id.
    pub fn from_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self::from_headers_with(headers, || Uuid::new_v4().to_string())
    }

    pub fn from_headers_with<I, K, V, F>(headers: I, generate_id: F) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
        F: FnOnce() -> String,
    {
        let mut correlation_id = None;
        let mut parent_id = None;

        for (name, value) in headers {
            let name = name.as_ref();
            if name.eq_ignore_ascii_case(CORRELATION_ID_HEADER) {
                correlation_id = Some(value.into());
            } else if name.eq_ignore_ascii_case(REQUEST_ID_HEADER) {
                parent_id = Some(value.into());
            }
        }

        let request_id = generate_id();
        Self {
            correlation_id: correlation_id.unwrap_or_else(|| request_id.clone()),
            request_id,
            parent_id: parent_id.unwrap_or_default(),
        }
    }

    /// Reads `CORRELATION_ID` / `REQUEST_ID` as if they were incoming headers.
    pub fn from_env() -> Self {
        let headers = [
            (CORRELATION_ID_HEADER, env::var(CORRELATION_ID_ENV).ok()),
            (REQUEST_ID_HEADER, env::var(REQUEST_ID_ENV).ok()),
        ];
        Self::from_headers(
            headers
                .into_iter()
                .filter_map(|(name, value)| value.map(|value| (name, value))),
        )
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    /// `{correlation_id}/{request_id}`
    pub fn default_stream_name(&self) -> String {
        format!("{}/{}", self.correlation_id, self.request_id)
    }

    /// Headers a downstream call should carry so it links back to this request.
    pub fn propagation_headers(&self) -> [(&'static str, String); 2] {
        [
            (CORRELATION_ID_HEADER, self.correlation_id.clone()),
            (REQUEST_ID_HEADER, self.request_id.clone()),
        ]
    }
}
