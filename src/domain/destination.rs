use std::collections::BTreeMap;

/// Where a handler ships its records.
///
/// Everything except the stream name is fixed for the handler's lifetime; the
/// stream can only be switched through `FlushEngine::set_stream_name`, which
/// flushes the old stream first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationIdentity {
    group_name: String,
    stream_name: String,
    tags: BTreeMap<String, String>,
    retention_days: u32,
}

pub const DEFAULT_RETENTION_DAYS: u32 = 90;

impl DestinationIdentity {
    pub fn new(group_name: impl Into<String>, stream_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            stream_name: stream_name.into(),
            tags: BTreeMap::new(),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }

    /// Builds the identity with the group derived from account, stage and application.
    pub fn for_application(
        account_alias: &str,
        stage: &str,
        application: &str,
        stream_name: impl Into<String>,
    ) -> Self {
        Self::new(group_name(account_alias, stage, application), stream_name)
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_retention_days(mut self, retention_days: u32) -> Self {
        self.retention_days = retention_days;
        self
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    pub(crate) fn set_stream_name(&mut self, stream_name: String) {
        self.stream_name = stream_name;
    }
}

/// `/{account}/{stage}/{application}`, lowercased.
pub fn group_name(account_alias: &str, stage: &str, application: &str) -> String {
    format!("/{account_alias}/{stage}/{application}").to_lowercase()
}
