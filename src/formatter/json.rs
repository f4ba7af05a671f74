use super::event::LogEvent;
use crate::domain::{ForwarderError, PendingRecord};
use crate::identity::RequestIdentity;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    identity: Option<RequestIdentity>,
    append_newline: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: RequestIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_newline(mut self, append_newline: bool) -> Self {
        self.append_newline = append_newline;
        self
    }

    pub fn identity(&self) -> Option<&RequestIdentity> {
        self.identity.as_ref()
    }

    pub fn format(&self, event: &LogEvent) -> Result<String, ForwarderError> {
        let mut context = event.context.clone();
        let tags = context.remove("tags").unwrap_or_else(|| json!([]));
        let entries = context.remove("entries").unwrap_or_else(|| json!([]));

        let mut output = Map::new();
        output.insert("type".to_string(), json!(event.level.as_str()));
        output.insert("message".to_string(), json!(event.message));
        output.insert("tags".to_string(), tags);
        output.insert("entries".to_string(), entries);

        if let Some(identity) = &self.identity {
            output.insert(
                "identity".to_string(),
                json!({
                    "correlation": identity.correlation_id(),
                    "request": identity.request_id(),
                    "parent": identity.parent_id(),
                }),
            );
        }

        if !event.extra.is_empty() {
            context.insert("extra".to_string(), Value::Object(event.extra.clone()));
        }
        if !context.is_empty() {
            output.insert("context".to_string(), Value::Object(context));
        }

        let mut formatted = serde_json::to_string(&Value::Object(output))
            .map_err(|e| ForwarderError::Format(e.to_string()))?;
        if self.append_newline {
            formatted.push('\n');
        }
        Ok(formatted)
    }

    /// Formats the event and stamps it with the event's own time.
    pub fn to_record(&self, event: &LogEvent) -> Result<PendingRecord, ForwarderError> {
        let formatted = self.format(event)?;
        Ok(PendingRecord::at(formatted, &event.datetime))
    }
}
