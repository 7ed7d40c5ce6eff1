//! Bridge configuration.
//!
//! Usually written by the UI collaborator; the headless binary reads it
//! from a TOML file next to the executable.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {0}: {1}")]
    Io(String, std::io::Error),
    #[error("could not parse {0}: {1}")]
    Parse(String, toml::de::Error),
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Use the handheld's own Wi-Fi chip through the plugin instead of a
    /// monitor mode adapter.
    pub use_psp_plugin: bool,
    /// Interface to capture on, or a capture file to replay.
    pub adapter_name: String,
    /// Only forward frames transmitted by this MAC address. Empty accepts
    /// every station of the locked cell.
    pub only_accept_from_mac: String,
    /// Forge an acknowledgement for every forwarded data frame.
    pub acknowledge_data_frames: bool,
    /// Preload the SSID filter with the PSP and Vita ad-hoc prefixes.
    pub auto_discover_psp_vita_networks: bool,
    /// Find the relay through its discovery broadcast instead of
    /// `relay_ip`. Not supported by the headless binary.
    pub auto_discover_relay: bool,
    pub relay_ip: String,
    pub relay_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            use_psp_plugin: false,
            adapter_name: "wlan0".to_string(),
            only_accept_from_mac: String::new(),
            acknowledge_data_frames: false,
            auto_discover_psp_vita_networks: true,
            auto_discover_relay: false,
            relay_ip: "127.0.0.1".to_string(),
            relay_port: 34523,
        }
    }
}

impl Config {
    /// Load the configuration, falling back to the defaults if the file
    /// does not exist yet.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|error| ConfigError::Io(path.display().to_string(), error))?;
        toml::from_str(&contents)
            .map_err(|error| ConfigError::Parse(path.display().to_string(), error))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert!(!config.use_psp_plugin);
        assert!(config.auto_discover_psp_vita_networks);
        assert_eq!(config.relay_port, 34523);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            adapter_name = "mon0"
            acknowledge_data_frames = true
            "#,
        )
        .unwrap();

        assert_eq!(config.adapter_name, "mon0");
        assert!(config.acknowledge_data_frames);
        assert_eq!(config.relay_ip, "127.0.0.1");
    }
}
