use std::path::Path;
use std::time::Duration;

use config::{Config, File};
use serde::{Deserialize, Serialize};

/// Configuration settings for a kettle's P2P node.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct KettleP2pConfig {
    /// The addresses to listen on for incoming connections.
    ///
    /// Multiaddr strings, one per transport, e.g.
    /// `/ip4/0.0.0.0/tcp/4001` and `/ip4/0.0.0.0/udp/4001/quic-v1`.
    pub listen_addrs: Vec<String>,

    /// Multiaddrs of peers dialed at startup to join the kettle network
    pub bootstrap_nodes: Vec<String>,

    /// The interval at which gossipsub heartbeat messages are sent to peers
    pub heartbeat_interval: Duration,

    /// The maximum duration a connection can remain idle before it is closed
    pub idle_connection_timeout: Duration,
}

impl KettleP2pConfig {
    /// Creates a new `KettleP2pConfig` instance from a configuration file.
    ///
    /// This method loads configuration settings from both a file and environment variables:
    /// - File: Reads the specified configuration file
    /// - Environment: Reads variables prefixed with `KETTLE_P2P__`
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
                config::Environment::with_prefix("KETTLE_P2P")
                    .keep_prefix(true)
                    .separator("__"),
            );
        let config = builder
            .build()
            .expect("Failed to generate kettle-p2p configuration file");
        config
            .get::<Self>("kettle_p2p")
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
[kettle_p2p]
listen_addrs = ["/ip4/127.0.0.1/tcp/4001", "/ip4/127.0.0.1/udp/4001/quic-v1"]
bootstrap_nodes = []
heartbeat_interval = {{ secs = 1, nanos = 0 }}
idle_connection_timeout = {{ secs = 30, nanos = 0 }}
"#
        )
        .unwrap();
        let config = KettleP2pConfig::from_file_path(file.path());
        assert_eq!(config.listen_addrs.len(), 2);
        assert!(config.bootstrap_nodes.is_empty());
        assert_eq!(config.heartbeat_interval, Duration::from_secs(1));
        assert_eq!(config.idle_connection_timeout, Duration::from_secs(30));
    }
}
