use std::path::Path;
use std::time::Duration;

use config::{Config, File};
use serde::{Deserialize, Serialize};

/// Configuration settings for the confidential store engine.
///
/// Controls the buffering and retry behavior of the replication subsystem;
/// the access-control semantics themselves are not configurable.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct KettleStoreConfig {
    /// Capacity of each subscriber's delivery queue.
    ///
    /// When a subscriber falls behind and its queue fills up, further
    /// messages addressed to it are dropped and logged rather than
    /// stalling delivery to other subscribers.
    pub subscriber_queue_capacity: usize,

    /// How many times an outbound replication message is re-offered to the
    /// transport before being dropped.
    pub publish_retry_attempts: u32,

    /// Pause between successive delivery attempts of one outbound message.
    pub publish_retry_backoff: Duration,
}

impl Default for KettleStoreConfig {
    fn default() -> Self {
        Self {
            subscriber_queue_capacity: 256,
            publish_retry_attempts: 3,
            publish_retry_backoff: Duration::from_millis(50),
        }
    }
}

impl KettleStoreConfig {
    /// Creates a new `KettleStoreConfig` instance from a configuration file.
    ///
    /// This method loads configuration settings from both a file and environment variables:
    /// - File: Reads the specified configuration file
    /// - Environment: Reads variables prefixed with `KETTLE_STORE__`
    ///
    /// # Panics
    ///
    /// This method will panic if:
    /// - The configuration file cannot be read or parsed
    /// - Required configuration values are missing
    /// - The configuration format is invalid
    pub fn from_file_path<P: AsRef<Path>>(config_file_path: P) -> Self {
        let builder = Config::builder()
            .add_source(File::with_name(config_file_path.as_ref().to_str().unwrap()))
            .add_source(
                config::Environment::with_prefix("KETTLE_STORE")
                    .keep_prefix(true)
                    .separator("__"),
            );
        let config = builder
            .build()
            .expect("Failed to generate kettle-store configuration file");
        config
            .get::<Self>("kettle_store")
            .expect("Failed to generate configuration instance")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn test_from_file_path_loads_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[kettle_store]
subscriber_queue_capacity = 64
publish_retry_attempts = 5
publish_retry_backoff = {{ secs = 0, nanos = 250000000 }}
"#
        )
        .unwrap();
        let config = KettleStoreConfig::from_file_path(file.path());
        assert_eq!(config.subscriber_queue_capacity, 64);
        assert_eq!(config.publish_retry_attempts, 5);
        assert_eq!(config.publish_retry_backoff, Duration::from_millis(250));
    }
}
