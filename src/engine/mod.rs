pub mod flush;
pub mod handler;

pub use flush::{EngineConfig, FlushEngine, SequenceTokenMode, validate_batch_size};
pub use handler::LogHandler;
