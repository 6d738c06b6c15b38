use crate::batcher::DEFAULT_BATCH_SIZE;
use crate::error::{Result, SdkError};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Settings for one migration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Events per import transaction
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// First block to scan on the source vault
    #[serde(default)]
    pub from_block: u64,

    /// Last block to scan (None = latest at start of run)
    #[serde(default)]
    pub to_block: Option<u64>,

    /// Split the log query into windows of this many blocks (None = one query)
    #[serde(default)]
    pub block_chunk_size: Option<u64>,

    /// Deadline for each confirmation wait (None = wait indefinitely)
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: Option<u64>,

    /// Receipt polling interval
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_confirmation_timeout() -> Option<u64> {
    Some(300)
}

fn default_poll_interval() -> u64 {
    2_000
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            from_block: 0,
            to_block: None,
            block_chunk_size: None,
            confirmation_timeout_secs: default_confirmation_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl MigrationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `MIGRATION_*` environment variables (a `.env` file is honoured).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Some(size) = env_parse::<usize>("MIGRATION_BATCH_SIZE")? {
            config.batch_size = size;
        }
        if let Some(from) = env_parse::<u64>("MIGRATION_FROM_BLOCK")? {
            config.from_block = from;
        }
        if let Some(to) = env_parse::<u64>("MIGRATION_TO_BLOCK")? {
            config.to_block = Some(to);
        }
        if let Some(chunk) = env_parse::<u64>("MIGRATION_BLOCK_CHUNK")? {
            config.block_chunk_size = Some(chunk);
        }
        if let Some(secs) = env_parse::<u64>("MIGRATION_CONFIRM_TIMEOUT_SECS")? {
            // 0 disables the deadline
            config.confirmation_timeout_secs = (secs > 0).then_some(secs);
        }

        Ok(config)
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_block_range(mut self, from: u64, to: Option<u64>) -> Self {
        self.from_block = from;
        self.to_block = to;
        self
    }

    pub fn with_block_chunk_size(mut self, chunk: Option<u64>) -> Self {
        self.block_chunk_size = chunk;
        self
    }

    pub fn with_confirmation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.confirmation_timeout_secs = timeout.map(|t| t.as_secs().max(1));
        self
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs.map(Duration::from_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SdkError::InvalidConfig("batch_size must be at least 1".into()));
        }
        if let Some(to) = self.to_block {
            if to < self.from_block {
                return Err(SdkError::InvalidConfig(format!(
                    "to_block {} is before from_block {}",
                    to, self.from_block
                )));
            }
        }
        if self.block_chunk_size == Some(0) {
            return Err(SdkError::InvalidConfig("block_chunk_size must be at least 1".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(SdkError::InvalidConfig("poll_interval_ms must be at least 1".into()));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| SdkError::InvalidConfig(format!("{} is not a valid number: {}", key, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.from_block, 0);
        assert_eq!(config.to_block, None);
        assert_eq!(config.confirmation_timeout(), Some(Duration::from_secs(300)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = MigrationConfig::new()
            .with_batch_size(10)
            .with_block_range(100, Some(50));
        assert!(matches!(config.validate(), Err(SdkError::InvalidConfig(_))));

        let config = MigrationConfig::new().with_batch_size(0);
        assert!(config.validate().is_err());

        let config = MigrationConfig::new().with_block_chunk_size(Some(0));
        assert!(config.validate().is_err());

        let config = MigrationConfig::new()
            .with_block_range(10, Some(20))
            .with_confirmation_timeout(None);
        assert!(config.validate().is_ok());
        assert_eq!(config.confirmation_timeout(), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: MigrationConfig = serde_json::from_str(r#"{"batch_size": 40}"#).unwrap();
        assert_eq!(config.batch_size, 40);
        assert_eq!(config.poll_interval_ms, 2_000);
        assert_eq!(config.confirmation_timeout_secs, Some(300));
    }
}
