//! Turns application log events into the JSON payload shipped as a record.

pub mod event;
pub mod json;

pub use event::LogEvent;
pub use json::JsonFormatter;
