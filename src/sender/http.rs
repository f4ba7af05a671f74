use super::client::{
    ClientError, CreateLogGroupRequest, CreateLogStreamRequest, DescribeLogStreamsRequest,
    ErrorKind, LogStreamDescription, LogsClient, PutLogEventsRequest, PutLogEventsResponse,
    PutRetentionPolicyRequest,
};
use crate::domain::ForwarderError;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

const TARGET_PREFIX: &str = "Logs_20140328";
const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_HEADER: &str = "x-amz-target";

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub max_connections: usize,
    pub user_agent: String,
    /// Sent verbatim with every request (credentials, proxy routing, ...).
    pub headers: Vec<(String, String)>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4566".to_string(),
            timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            max_connections: 4,
            user_agent: format!("cloudwatch-log-forwarder/{}", env!("CARGO_PKG_VERSION")),
            headers: Vec::new(),
        }
    }
}

/// [`LogsClient`] speaking the backend's JSON 1.1 protocol over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLogsClient {
    client: Client,
    config: HttpClientConfig,
    endpoint_url: Url,
    default_headers: HeaderMap,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
    #[serde(rename = "expectedSequenceToken")]
    expected_sequence_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsResponse {
    #[serde(default)]
    log_streams: Vec<LogStreamDescription>,
}

#[derive(Debug, Deserialize)]
struct EmptyResponse {}

impl HttpLogsClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, ForwarderError> {
        let endpoint_url: Url = config.endpoint.parse().map_err(|e| {
            ForwarderError::Config(format!("Invalid endpoint URL '{}': {e}", config.endpoint))
        })?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ForwarderError::Config(format!("Invalid header name '{name}': {e}")))?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                ForwarderError::Config(format!("Invalid value for header '{name}': {e}"))
            })?;
            default_headers.insert(header_name, header_value);
        }

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .pool_max_idle_per_host(config.max_connections)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ForwarderError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            endpoint_url,
            default_headers,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp, ClientError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request)
            .map_err(|e| ClientError::other("SerializationException", e.to_string()))?;

        debug!("Calling {operation} ({} bytes)", payload.len());

        let response = self
            .client
            .post(self.endpoint_url.clone())
            .headers(self.default_headers.clone())
            .header(TARGET_HEADER, format!("{TARGET_PREFIX}.{operation}"))
            .body(payload)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(network_error)?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body));
        }

        let body: &[u8] = if body.is_empty() { b"{}" } else { &body };
        serde_json::from_slice(body).map_err(|e| {
            ClientError::other(
                "SerializationException",
                format!("Invalid {operation} response: {e}"),
            )
        })
    }
}

impl LogsClient for HttpLogsClient {
    async fn create_log_group(&self, request: CreateLogGroupRequest) -> Result<(), ClientError> {
        self.call::<_, EmptyResponse>("CreateLogGroup", &request)
            .await
            .map(|_| ())
    }

    async fn put_retention_policy(
        &self,
        request: PutRetentionPolicyRequest,
    ) -> Result<(), ClientError> {
        self.call::<_, EmptyResponse>("PutRetentionPolicy", &request)
            .await
            .map(|_| ())
    }

    async fn create_log_stream(&self, request: CreateLogStreamRequest) -> Result<(), ClientError> {
        self.call::<_, EmptyResponse>("CreateLogStream", &request)
            .await
            .map(|_| ())
    }

    async fn put_log_events(
        &self,
        request: PutLogEventsRequest,
    ) -> Result<PutLogEventsResponse, ClientError> {
        self.call("PutLogEvents", &request).await
    }

    async fn describe_log_streams(
        &self,
        request: DescribeLogStreamsRequest,
    ) -> Result<Vec<LogStreamDescription>, ClientError> {
        self.call::<_, DescribeLogStreamsResponse>("DescribeLogStreams", &request)
            .await
            .map(|response| response.log_streams)
    }
}

fn network_error(error: reqwest::Error) -> ClientError {
    if error.is_timeout() {
        ClientError::other("RequestTimeout", error.to_string())
    } else {
        ClientError::other("NetworkError", error.to_string())
    }
}

/// Maps a non-2xx response onto an [`ErrorKind`] using the `__type` field.
pub fn classify_error(status: u16, body: &[u8]) -> ClientError {
    let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) else {
        return ClientError::other(
            "HttpError",
            format!("HTTP {status}: {}", String::from_utf8_lossy(body)),
        );
    };

    // "com.amazonaws.logs#ResourceNotFoundException" -> "ResourceNotFoundException"
    let code = parsed
        .error_type
        .as_deref()
        .and_then(|t| t.rsplit('#').next())
        .unwrap_or("HttpError")
        .to_string();
    let message = parsed.message.unwrap_or_else(|| format!("HTTP {status}"));

    let kind = match code.as_str() {
        "ResourceAlreadyExistsException" => ErrorKind::AlreadyExists,
        "ResourceNotFoundException" => ErrorKind::NotFound,
        "InvalidSequenceTokenException" => ErrorKind::InvalidSequenceToken,
        _ => ErrorKind::Other,
    };

    ClientError::new(kind, code, message).with_expected_sequence_token(parsed.expected_sequence_token)
}
