use crate::domain::LogLevel;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// An application log event before formatting.
///
/// `context` may carry two reserved keys, `tags` and `entries`, which the
/// formatter lifts to the top level of the output.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub datetime: DateTime<Utc>,
    pub context: Map<String, Value>,
    pub extra: Map<String, Value>,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            datetime: Utc::now(),
            context: Map::new(),
            extra: Map::new(),
        }
    }

    pub fn at(mut self, datetime: DateTime<Utc>) -> Self {
        self.datetime = datetime;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<Value> = tags.into_iter().map(|t| Value::String(t.into())).collect();
        self.with_context("tags", tags)
    }
}
