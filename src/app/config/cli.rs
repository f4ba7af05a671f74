use super::serde_helpers::{
    load_env_path_opt, load_env_string, load_env_string_opt, load_env_var, pairs_as_map,
    parse_header, parse_tag,
};
use super::{ConfigError, LogFormat, LogLevel};
use crate::domain::{DEFAULT_RETENTION_DAYS, DestinationIdentity};
use crate::engine::{EngineConfig, SequenceTokenMode};
use crate::identity::RequestIdentity;
use crate::sender::HttpClientConfig;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Logs backend endpoint URL
    #[arg(long, env = "LOGS_ENDPOINT", default_value = "http://localhost:4566")]
    pub endpoint: String,

    /// Account alias, first segment of the log group name
    #[arg(long, env = "ACCOUNT_ALIAS", default_value = "")]
    pub account_alias: String,

    /// Deployment stage, second segment of the log group name
    #[arg(long, env = "STAGE", default_value = "")]
    pub stage: String,

    /// Application name, last segment of the log group name
    #[arg(long, env = "APPLICATION", default_value = "")]
    pub application: String,

    /// Retention applied when the log group is created
    #[arg(long, env = "RETENTION_DAYS", default_value = "90")]
    pub retention_days: u32,

    /// Records per put (1-10000)
    #[arg(long, env = "BATCH_SIZE", default_value = "10000")]
    pub batch_size: usize,

    /// Tag attached to the log group on creation (repeatable)
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
    #[serde(with = "pairs_as_map")]
    pub tags: Vec<(String, String)>,

    /// Stream name override (defaults to "{correlation id}/{request id}")
    #[arg(long, env = "STREAM_NAME")]
    pub stream_name: Option<String>,

    /// Track upload sequence tokens, for backends that still require them
    #[arg(long, env = "SEQUENCE_TOKENS")]
    pub sequence_tokens: bool,

    /// Header sent with every backend request (repeatable)
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    #[serde(with = "pairs_as_map")]
    pub headers: Vec<(String, String)>,

    /// Request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Connection timeout in seconds
    #[arg(long, env = "CONNECTION_TIMEOUT_SECS", default_value = "10")]
    pub connection_timeout_secs: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Ship stdin lines as-is instead of wrapping them in a JSON event
    #[arg(long, env = "RAW")]
    pub raw: bool,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub request_timeout: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub connection_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4566".to_string(),
            account_alias: String::new(),
            stage: String::new(),
            application: String::new(),
            retention_days: DEFAULT_RETENTION_DAYS,
            batch_size: 10000,
            tags: Vec::new(),
            stream_name: None,
            sequence_tokens: false,
            headers: Vec::new(),
            request_timeout_secs: 30,
            connection_timeout_secs: 10,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            raw: false,
            config_file: None,
            request_timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::parse_from(args);
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        load_env_string("LOGS_ENDPOINT", &mut config.endpoint);
        load_env_string("ACCOUNT_ALIAS", &mut config.account_alias);
        load_env_string("STAGE", &mut config.stage);
        load_env_string("APPLICATION", &mut config.application);
        load_env_var("RETENTION_DAYS", &mut config.retention_days)?;
        load_env_var("BATCH_SIZE", &mut config.batch_size)?;
        load_env_string_opt("STREAM_NAME", &mut config.stream_name);
        load_env_var("SEQUENCE_TOKENS", &mut config.sequence_tokens)?;
        load_env_var("REQUEST_TIMEOUT_SECS", &mut config.request_timeout_secs)?;
        load_env_var("CONNECTION_TIMEOUT_SECS", &mut config.connection_timeout_secs)?;
        load_env_var("LOG_LEVEL", &mut config.log_level)?;
        load_env_var("LOG_FORMAT", &mut config.log_format)?;
        load_env_var("RAW", &mut config.raw)?;
        load_env_path_opt("CONFIG_FILE", &mut config.config_file);

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.request_timeout = Duration::from_secs(self.request_timeout_secs);
        self.connection_timeout = Duration::from_secs(self.connection_timeout_secs);
        Ok(())
    }

    pub fn tag_map(&self) -> BTreeMap<String, String> {
        self.tags.iter().cloned().collect()
    }

    /// Resolves where records go: the configured override, or a stream named
    /// after the request identity.
    pub fn destination(&self, identity: &RequestIdentity) -> DestinationIdentity {
        let stream_name = self
            .stream_name
            .clone()
            .unwrap_or_else(|| identity.default_stream_name());

        DestinationIdentity::for_application(
            &self.account_alias,
            &self.stage,
            &self.application,
            stream_name,
        )
        .with_tags(self.tag_map())
        .with_retention_days(self.retention_days)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            batch_size: self.batch_size,
            sequence_tokens: if self.sequence_tokens {
                SequenceTokenMode::Tracked
            } else {
                SequenceTokenMode::Disabled
            },
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            endpoint: self.endpoint.clone(),
            timeout: self.request_timeout,
            connection_timeout: self.connection_timeout,
            headers: self.headers.clone(),
            ..HttpClientConfig::default()
        }
    }
}
