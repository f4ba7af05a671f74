pub mod client;
pub mod http;
pub mod stats;

pub use client::{
    ClientError, CreateLogGroupRequest, CreateLogStreamRequest, DescribeLogStreamsRequest,
    ErrorKind, InputLogEvent, LogStreamDescription, LogsClient, PutLogEventsRequest,
    PutLogEventsResponse, PutRetentionPolicyRequest,
};
pub use http::{HttpClientConfig, HttpLogsClient, classify_error};
pub use stats::{FlushStats, FlushStatsSnapshot};
