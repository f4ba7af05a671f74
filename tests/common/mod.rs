#![allow(dead_code)]

use cloudwatch_log_forwarder::sender::{
    ClientError, CreateLogGroupRequest, CreateLogStreamRequest, DescribeLogStreamsRequest,
    LogStreamDescription, LogsClient, PutLogEventsRequest, PutLogEventsResponse,
    PutRetentionPolicyRequest,
};
use cloudwatch_log_forwarder::{DestinationIdentity, EngineConfig, FlushEngine, PendingRecord};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateLogGroup(CreateLogGroupRequest),
    PutRetentionPolicy(PutRetentionPolicyRequest),
    CreateLogStream(CreateLogStreamRequest),
    PutLogEvents(PutLogEventsRequest),
    DescribeLogStreams(DescribeLogStreamsRequest),
}

/// In-memory client that records every call and answers from scripted queues.
/// An empty queue answers with success.
#[derive(Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    create_group: Mutex<VecDeque<Result<(), ClientError>>>,
    retention: Mutex<VecDeque<Result<(), ClientError>>>,
    create_stream: Mutex<VecDeque<Result<(), ClientError>>>,
    put: Mutex<VecDeque<Result<PutLogEventsResponse, ClientError>>>,
    describe: Mutex<VecDeque<Result<Vec<LogStreamDescription>, ClientError>>>,
}

impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_create_group(&self, result: Result<(), ClientError>) {
        self.create_group.lock().push_back(result);
    }

    pub fn script_retention(&self, result: Result<(), ClientError>) {
        self.retention.lock().push_back(result);
    }

    pub fn script_create_stream(&self, result: Result<(), ClientError>) {
        self.create_stream.lock().push_back(result);
    }

    pub fn script_put(&self, result: Result<PutLogEventsResponse, ClientError>) {
        self.put.lock().push_back(result);
    }

    pub fn script_put_token(&self, token: &str) {
        self.script_put(Ok(PutLogEventsResponse {
            next_sequence_token: Some(token.to_string()),
        }));
    }

    pub fn script_describe(&self, result: Result<Vec<LogStreamDescription>, ClientError>) {
        self.describe.lock().push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn puts(&self) -> Vec<PutLogEventsRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::PutLogEvents(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Messages of each put, in order.
    pub fn put_messages(&self) -> Vec<Vec<String>> {
        self.puts()
            .into_iter()
            .map(|put| put.log_events.into_iter().map(|e| e.message).collect())
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| matches(call)).count()
    }

    pub fn create_group_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::CreateLogGroup(_)))
    }

    pub fn retention_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::PutRetentionPolicy(_)))
    }

    pub fn create_stream_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::CreateLogStream(_)))
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl LogsClient for RecordingClient {
    async fn create_log_group(&self, request: CreateLogGroupRequest) -> Result<(), ClientError> {
        self.record(Call::CreateLogGroup(request));
        self.create_group.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn put_retention_policy(
        &self,
        request: PutRetentionPolicyRequest,
    ) -> Result<(), ClientError> {
        self.record(Call::PutRetentionPolicy(request));
        self.retention.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn create_log_stream(&self, request: CreateLogStreamRequest) -> Result<(), ClientError> {
        self.record(Call::CreateLogStream(request));
        self.create_stream.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn put_log_events(
        &self,
        request: PutLogEventsRequest,
    ) -> Result<PutLogEventsResponse, ClientError> {
        self.record(Call::PutLogEvents(request));
        self.put
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(PutLogEventsResponse::default()))
    }

    async fn describe_log_streams(
        &self,
        request: DescribeLogStreamsRequest,
    ) -> Result<Vec<LogStreamDescription>, ClientError> {
        self.record(Call::DescribeLogStreams(request));
        self.describe.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn destination() -> DestinationIdentity {
    DestinationIdentity::for_application("Acme", "Prod", "Billing", "corr-1/req-1")
}

pub fn engine(client: &Arc<RecordingClient>, batch_size: usize) -> FlushEngine<Arc<RecordingClient>> {
    FlushEngine::new(
        Arc::clone(client),
        destination(),
        EngineConfig {
            batch_size,
            ..EngineConfig::default()
        },
    )
    .unwrap()
}

pub fn record(message: &str, timestamp_millis: i64) -> PendingRecord {
    PendingRecord::new(message.to_string(), timestamp_millis)
}
