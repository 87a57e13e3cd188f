//! Configuration resolution for SealChat.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/sealchat/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binaries)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete SealChat configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// Relay-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelayConfig {
    pub listen_addr: String,
    /// Largest accepted frame, line-feed excluded.
    pub max_frame_bytes: usize,
    /// Capacity of each connection's outbound record queue.
    pub outbound_queue: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:9000".to_string(),
            max_frame_bytes: 64 * 1024, // 64 KiB
            outbound_queue: 128,
        }
    }
}

/// Key generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CryptoConfig {
    /// Upper bound of the initial prime search range.
    pub prime_range: u64,
    /// Amount the range grows after a degenerate round.
    pub range_step: u64,
    /// Draws per prime before giving up on the current range.
    pub max_prime_tries: u32,
    /// Generation rounds before key generation fails outright.
    pub max_rounds: u32,
    /// Smallest acceptable modulus. Must exceed every symbol value that
    /// will be encrypted (FEC units are below 128).
    pub min_modulus: u64,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            prime_range: 1000,
            range_step: 1000,
            max_prime_tries: 1000,
            max_rounds: 32,
            min_modulus: 256,
        }
    }
}

/// Client-side configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub relay_addr: String,
    pub display_name: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_addr: "127.0.0.1:9000".to_string(),
            display_name: None,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// `explicit` is a file named on the command line; unlike the global file
/// it must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            config = load_config_file(&global_path)?;
        }
    }

    if let Some(path) = explicit {
        config = load_config_file(path)?;
    }

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sealchat").join("settings.json"))
}

/// Read and parse one JSON config file. Missing sections fall back to defaults.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("SEALCHAT_LISTEN_ADDR") {
        config.relay.listen_addr = val;
    }
    if let Ok(val) = std::env::var("SEALCHAT_MAX_FRAME_BYTES") {
        if let Ok(n) = val.parse() {
            config.relay.max_frame_bytes = n;
        }
    }
    if let Ok(val) = std::env::var("SEALCHAT_PRIME_RANGE") {
        if let Ok(n) = val.parse() {
            config.crypto.prime_range = n;
        }
    }
    if let Ok(val) = std::env::var("SEALCHAT_RELAY_ADDR") {
        config.client.relay_addr = val;
    }
    if let Ok(val) = std::env::var("SEALCHAT_NAME") {
        config.client.display_name = Some(val);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_min_modulus_covers_fec_units() {
        let config = Config::default();
        assert!(config.crypto.min_modulus > 0x7F);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"relay":{"listen_addr":"0.0.0.0:7000"}}"#).unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.relay.listen_addr, "0.0.0.0:7000");
        assert_eq!(config.relay.max_frame_bytes, 64 * 1024);
        assert_eq!(config.crypto, CryptoConfig::default());
    }

    #[test]
    fn unparsable_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("broken.json")));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("absent.json")));
        assert!(result.is_err());
    }
}
