//! Idempotent on-demand creation of the log group and log stream.
//!
//! Existence is established by attempting the create call and classifying the
//! failure, never by listing first: two processes initializing the same
//! destination cannot race between a describe and a create.

use crate::domain::DestinationIdentity;
use crate::sender::{
    ClientError, CreateLogGroupRequest, CreateLogStreamRequest, LogsClient,
    PutRetentionPolicyRequest,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Stream creation attempts before giving up on a missing group.
pub const MAX_BOOTSTRAP_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Created,
    AlreadyExisted,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("Failed to create log group: {0}")]
    Group(ClientError),

    #[error("Failed to set retention policy: {0}")]
    Retention(ClientError),

    #[error("Failed to create log stream: {0}")]
    Stream(ClientError),

    #[error("Log stream could not be created after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: ClientError },
}

impl BootstrapError {
    pub fn client_error(&self) -> &ClientError {
        match self {
            BootstrapError::Group(e) | BootstrapError::Retention(e) | BootstrapError::Stream(e) => e,
            BootstrapError::Exhausted { last, .. } => last,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResourceBootstrapper {
    max_attempts: u32,
}

impl Default for ResourceBootstrapper {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBootstrapper {
    pub fn new() -> Self {
        Self {
            max_attempts: MAX_BOOTSTRAP_ATTEMPTS,
        }
    }

    /// Creates the group if needed. The retention policy is only set on the
    /// call that actually created it.
    pub async fn ensure_group<C: LogsClient>(
        &self,
        client: &C,
        destination: &DestinationIdentity,
    ) -> Result<ResourceStatus, BootstrapError> {
        let tags = destination.tags();
        let request = CreateLogGroupRequest {
            log_group_name: destination.group_name().to_string(),
            tags: (!tags.is_empty()).then(|| tags.clone()),
        };

        match client.create_log_group(request).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                debug!("Log group {} already exists", destination.group_name());
                return Ok(ResourceStatus::AlreadyExisted);
            }
            Err(e) => return Err(BootstrapError::Group(e)),
        }

        client
            .put_retention_policy(PutRetentionPolicyRequest {
                log_group_name: destination.group_name().to_string(),
                retention_in_days: destination.retention_days(),
            })
            .await
            .map_err(BootstrapError::Retention)?;

        info!(
            "Created log group {} (retention {} days)",
            destination.group_name(),
            destination.retention_days()
        );
        Ok(ResourceStatus::Created)
    }

    /// Creates the stream if needed, creating the group first when the backend
    /// reports it missing.
    pub async fn ensure_stream<C: LogsClient>(
        &self,
        client: &C,
        destination: &DestinationIdentity,
    ) -> Result<ResourceStatus, BootstrapError> {
        let request = CreateLogStreamRequest {
            log_group_name: destination.group_name().to_string(),
            log_stream_name: destination.stream_name().to_string(),
        };

        let mut last_missing = None;
        for attempt in 1..=self.max_attempts {
            match client.create_log_stream(request.clone()).await {
                Ok(()) => {
                    info!(
                        "Created log stream {} in {}",
                        destination.stream_name(),
                        destination.group_name()
                    );
                    return Ok(ResourceStatus::Created);
                }
                Err(e) if e.is_already_exists() => {
                    debug!("Log stream {} already exists", destination.stream_name());
                    return Ok(ResourceStatus::AlreadyExisted);
                }
                Err(e) if e.is_not_found() => {
                    warn!(
                        "Log group {} missing while creating stream (attempt {attempt}/{})",
                        destination.group_name(),
                        self.max_attempts
                    );
                    if attempt < self.max_attempts {
                        self.ensure_group(client, destination).await?;
                    }
                    last_missing = Some(e);
                }
                Err(e) => return Err(BootstrapError::Stream(e)),
            }
        }

        Err(BootstrapError::Exhausted {
            attempts: self.max_attempts,
            last: last_missing
                .unwrap_or_else(|| ClientError::not_found("log stream was never attempted")),
        })
    }
}
