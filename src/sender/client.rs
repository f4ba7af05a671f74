use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// How a backend failure should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The group or stream being created is already there.
    AlreadyExists,
    /// The group or stream an operation targets does not exist.
    NotFound,
    /// The sequence token sent with a put was stale.
    InvalidSequenceToken,
    /// Anything else: authorization, throttling, malformed request, network.
    Other,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ClientError {
    kind: ErrorKind,
    code: String,
    message: String,
    expected_sequence_token: Option<String>,
}

impl ClientError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            expected_sequence_token: None,
        }
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::AlreadyExists,
            "ResourceAlreadyExistsException",
            message,
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, "ResourceNotFoundException", message)
    }

    pub fn invalid_sequence_token(expected: Option<String>) -> Self {
        Self {
            expected_sequence_token: expected,
            ..Self::new(
                ErrorKind::InvalidSequenceToken,
                "InvalidSequenceTokenException",
                "The given sequenceToken is invalid",
            )
        }
    }

    pub fn other(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Other, code, message)
    }

    pub fn with_expected_sequence_token(mut self, token: Option<String>) -> Self {
        self.expected_sequence_token = token;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn expected_sequence_token(&self) -> Option<&str> {
        self.expected_sequence_token.as_deref()
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind == ErrorKind::AlreadyExists
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogGroupRequest {
    pub log_group_name: String,
    /// Never sent as an empty map: `None` drops the field from the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRetentionPolicyRequest {
    pub log_group_name: String,
    pub retention_in_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogStreamRequest {
    pub log_group_name: String,
    pub log_stream_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLogEvent {
    pub message: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutLogEventsRequest {
    pub log_group_name: String,
    pub log_stream_name: String,
    pub log_events: Vec<InputLogEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutLogEventsResponse {
    #[serde(default)]
    pub next_sequence_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeLogStreamsRequest {
    pub log_group_name: String,
    pub log_stream_name_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStreamDescription {
    pub log_stream_name: String,
    #[serde(default)]
    pub upload_sequence_token: Option<String>,
}

/// The remote log-ingestion capability the engine drives.
///
/// Implementations must classify every failure into an [`ErrorKind`]; callers
/// never inspect codes or messages.
pub trait LogsClient: Send + Sync {
    fn create_log_group(
        &self,
        request: CreateLogGroupRequest,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn put_retention_policy(
        &self,
        request: PutRetentionPolicyRequest,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn create_log_stream(
        &self,
        request: CreateLogStreamRequest,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn put_log_events(
        &self,
        request: PutLogEventsRequest,
    ) -> impl Future<Output = Result<PutLogEventsResponse, ClientError>> + Send;

    /// Only used to refetch a sequence token on backends that still require one.
    fn describe_log_streams(
        &self,
        request: DescribeLogStreamsRequest,
    ) -> impl Future<Output = Result<Vec<LogStreamDescription>, ClientError>> + Send;
}

impl<C: LogsClient> LogsClient for Arc<C> {
    fn create_log_group(
        &self,
        request: CreateLogGroupRequest,
    ) -> impl Future<Output = Result<(), ClientError>> + Send {
        (**self).create_log_group(request)
    }

    fn put_retention_policy(
        &self,
        request: PutRetentionPolicyRequest,
    ) -> impl Future<Output = Result<(), ClientError>> + Send {
        (**self).put_retention_policy(request)
    }

    fn create_log_stream(
        &self,
        request: CreateLogStreamRequest,
    ) -> impl Future<Output = Result<(), ClientError>> + Send {
        (**self).create_log_stream(request)
    }

    fn put_log_events(
        &self,
        request: PutLogEventsRequest,
    ) -> impl Future<Output = Result<PutLogEventsResponse, ClientError>> + Send {
        (**self).put_log_events(request)
    }

    fn describe_log_streams(
        &self,
        request: DescribeLogStreamsRequest,
    ) -> impl Future<Output = Result<Vec<LogStreamDescription>, ClientError>> + Send {
        (**self).describe_log_streams(request)
    }
}
