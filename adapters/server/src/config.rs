//! Server configuration loaded from TOML.

use std::{fs, net::SocketAddr, path::Path};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

const SUPPORTED_CONFIG_VERSION: u32 = 1;

/// Runtime configuration for the room server.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Format version of the configuration file.
    pub version: u32,
    /// Address the HTTP listener binds to.
    pub bind: SocketAddr,
    /// Seed for the shared random source. Drawn from entropy when absent.
    pub seed: Option<u64>,
    /// Minimum whole seconds of timer decay before a read writes back.
    pub state_write_interval_secs: u32,
    /// Backing store settings.
    pub store: StoreConfig,
}

/// Settings for the backing room store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Maximum number of writes before the store reports exhaustion.
    pub write_quota: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            seed: None,
            state_write_interval_secs: 5,
            store: StoreConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read server config at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid server config at {}", path.display()))
    }

    /// Parses and validates configuration contents.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse server config toml contents")?;
        if config.version != SUPPORTED_CONFIG_VERSION {
            bail!(
                "unsupported server config version {}; expected {}",
                config.version,
                SUPPORTED_CONFIG_VERSION
            );
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(ServerConfig::parse("").expect("parse"), ServerConfig::default());
    }

    #[test]
    fn fields_override_defaults() {
        let config = ServerConfig::parse(
            r#"
            bind = "0.0.0.0:8080"
            seed = 7
            state_write_interval_secs = 10

            [store]
            write_quota = 500
            "#,
        )
        .expect("parse");

        assert_eq!(config.bind, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.state_write_interval_secs, 10);
        assert_eq!(config.store.write_quota, Some(500));
    }

    #[test]
    fn unknown_versions_and_fields_are_rejected() {
        assert!(ServerConfig::parse("version = 2").is_err());
        assert!(ServerConfig::parse("port = 80").is_err());
    }
}
