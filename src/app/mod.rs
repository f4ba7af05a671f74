pub mod config;
pub mod initialization;
pub mod logging_system;

pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use initialization::InitializationError;
pub use logging_system::{LoggingSystem, setup_logging};

use crate::domain::{LogLevel as EventLevel, PendingRecord};
use crate::engine::{FlushEngine, LogHandler};
use crate::formatter::{JsonFormatter, LogEvent};
use crate::identity::RequestIdentity;
use crate::sender::{HttpLogsClient, LogsClient};
use std::process;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// Ships stdin, one record per line, to the configured log stream.
pub struct App<C: LogsClient = HttpLogsClient> {
    config: Config,
    handler: LogHandler<C>,
}

impl App<HttpLogsClient> {
    pub fn from_args<I, T>(args: I) -> Result<Self, Box<dyn std::error::Error + Send + Sync>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::from_args(args)?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let config = if let Some(config_file) = &config.config_file {
            info!("Loading configuration from file: {}", config_file.display());
            Config::from_file(config_file)?
        } else {
            config
        };

        let client = HttpLogsClient::new(config.http_client_config())?;
        Ok(Self::with_client(config, client, RequestIdentity::from_env())?)
    }
}

impl<C: LogsClient> App<C> {
    pub fn with_client(
        config: Config,
        client: C,
        identity: RequestIdentity,
    ) -> Result<Self, crate::domain::ForwarderError> {
        let destination = config.destination(&identity);
        info!(
            "Shipping to {}/{} (batch_size={}, sequence_tokens={})",
            destination.group_name(),
            destination.stream_name(),
            config.batch_size,
            config.sequence_tokens
        );

        let engine = FlushEngine::new(client, destination, config.engine_config())?;
        let formatter = JsonFormatter::new().with_identity(identity);
        Ok(Self {
            config,
            handler: LogHandler::new(engine, formatter),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn handler(&self) -> &LogHandler<C> {
        &self.handler
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.ship(BufReader::new(tokio::io::stdin())).await
    }

    /// Submits every line of `reader` until EOF or Ctrl-C, then closes the stream.
    ///
    /// A failed flush along the way is logged and shipping continues; only the
    /// final flush decides the result.
    pub async fn ship<R>(&self, reader: R) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if line.is_empty() {
                        continue;
                    }
                    if let Err(e) = self.ship_line(line).await {
                        warn!("Failed to ship line: {}", e);
                    }
                }
                _ = &mut shutdown => {
                    info!("Received Ctrl-C, flushing pending records");
                    break;
                }
            }
        }

        self.handler.close().await?;
        Ok(())
    }

    async fn ship_line(&self, line: String) -> Result<(), crate::domain::ForwarderError> {
        if self.config.raw {
            self.handler.submit(PendingRecord::now(line)).await
        } else {
            self.handler
                .handle(&LogEvent::new(EventLevel::Info, line))
                .await
        }
    }
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// Main entry point for the application
pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = match Config::from_args(std::env::args()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = setup_logging(config.log_level, config.log_format) {
        eprintln!("Failed to initialize logging: {e}");
    }
    info!("Starting cloudwatch-log-forwarder v{}", get_version());

    let app = match App::from_config(config) {
        Ok(app) => app,
        Err(e) => {
            error!("Startup error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = app.run().await {
        error!("Final flush failed: {}", e);
        process::exit(1);
    }

    info!("cloudwatch-log-forwarder stopped.");
    Ok(())
}
