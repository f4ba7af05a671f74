use super::config::{LogFormat, LogLevel};
use super::initialization::{FallbackStrategy, InitializationError, LogDirective};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Builds the `EnvFilter` for the forwarder's own diagnostics and installs the
/// global subscriber.
pub struct LoggingSystem {
    directives: Arc<RwLock<Vec<LogDirective>>>,
    fallback_level: LogLevel,
    format: LogFormat,
}

impl LoggingSystem {
    pub fn new(format: LogFormat) -> Self {
        Self {
            directives: Arc::new(RwLock::new(Vec::new())),
            fallback_level: LogLevel::Info,
            format,
        }
    }

    /// Adds a `target=level` directive. A malformed directive is skipped and an
    /// unknown level falls back to the default level; both are reported on stderr
    /// since tracing is not up yet.
    pub fn add_directive(&self, directive_str: &str) -> Result<(), InitializationError> {
        match LogDirective::parse(directive_str) {
            Ok(directive) => {
                self.directives.write().push(directive);
                Ok(())
            }
            Err(e) => match e.fallback_strategy() {
                FallbackStrategy::UseDefaultLevel => {
                    eprintln!("Warning: {e}, using default level");
                    let target = directive_str.split('=').next().unwrap_or_default().trim();
                    self.directives
                        .write()
                        .push(LogDirective::new(target, self.fallback_level));
                    Ok(())
                }
                FallbackStrategy::SkipDirective => {
                    eprintln!("Warning: {e}, skipping directive");
                    Ok(())
                }
                FallbackStrategy::AbortStartup => Err(e),
            },
        }
    }

    /// Quiets the HTTP stack, which is chatty at debug.
    pub fn add_default_directives(&self) {
        let mut directives = self.directives.write();
        for target in ["hyper", "reqwest", "h2"] {
            directives.push(LogDirective::new(target, LogLevel::Warn));
        }
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();

        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        filter_parts.extend(directives.iter().map(LogDirective::to_filter_string));
        filter_parts.join(",")
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }

    pub fn initialize_tracing(&self, default_level: LogLevel) -> Result<(), InitializationError> {
        let filter_string = self.build_filter_string(default_level);
        let env_filter = EnvFilter::try_new(&filter_string).map_err(|e| {
            InitializationError::LoggingInitFailed {
                details: format!("Failed to create EnvFilter with '{filter_string}'"),
                source: Box::new(e),
            }
        })?;

        let registry = tracing_subscriber::registry().with(env_filter);
        let result = match self.format {
            LogFormat::Compact => tracing::subscriber::set_global_default(
                registry.with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr)
                        .compact(),
                ),
            ),
            LogFormat::Json => tracing::subscriber::set_global_default(
                registry.with(
                    fmt::layer()
                        .with_target(true)
                        .with_writer(std::io::stderr)
                        .json(),
                ),
            ),
        };

        result.map_err(|e| InitializationError::LoggingInitFailed {
            details: "Failed to set global tracing subscriber".to_string(),
            source: Box::new(e),
        })
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new(LogFormat::default())
    }
}

/// Installs the subscriber for the binary. Fails if one is already installed.
pub fn setup_logging(level: LogLevel, format: LogFormat) -> Result<(), InitializationError> {
    let logging_system = LoggingSystem::new(format);
    logging_system.add_default_directives();
    logging_system.initialize_tracing(level)
}
