//! Domain layer for cloudwatch-log-forwarder.
//!
//! Contains the canonical types shared across all modules:
//! - `PendingRecord`: a serialized message plus its millisecond timestamp
//! - `DestinationIdentity`: target group/stream, tags and retention
//! - `LogLevel`: severity of a shipped event
//! - `ForwarderError`: top-level error type

pub mod destination;
pub mod error;
pub mod log_level;
pub mod record;

pub use destination::{DEFAULT_RETENTION_DAYS, DestinationIdentity, group_name};
pub use error::ForwarderError;
pub use log_level::LogLevel;
pub use record::PendingRecord;
