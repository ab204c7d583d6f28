// Configuration management for the Sensorlink CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/sensorlink/config.json
// - Linux: ~/.config/sensorlink/config.json
// - Windows: %APPDATA%\sensorlink\config.json

use anyhow::{Context, Result};
use sensorlink_core::overrides::DEFAULT_OVERRIDES;
use sensorlink_core::{LocationOverrides, SensorLocation};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that takes precedence over `private_key_hex`.
pub const PRIVATE_KEY_ENV: &str = "SENSORLINK_PRIVATE_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => anyhow::bail!("Unknown output format: {} (expected text or json)", other),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Extra surveyed position for a seller, keyed by its public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub public_key: String,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TCP port to accept seller connections on
    pub listen_port: u16,

    /// Read deadline for the next frame, in seconds
    pub read_timeout_secs: u64,

    /// Hex secp256k1 secret for a stable peer id (random identity if unset)
    pub private_key_hex: Option<String>,

    /// Seller multiaddrs dialled at start-up
    pub sellers: Vec<String>,

    /// Include the shipped table of surveyed seller sites
    pub use_default_overrides: bool,

    /// Additional location overrides
    pub location_overrides: Vec<OverrideEntry>,

    /// How decoded records are printed
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: 6653,
            read_timeout_secs: 5,
            private_key_hex: None,
            sellers: vec![],
            use_default_overrides: true,
            location_overrides: vec![],
            output: OutputFormat::Text,
        }
    }
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("sensorlink");

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    /// Load config from `path`, or write and return defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            let config: Config =
                serde_json::from_str(&contents).context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Add a seller address; returns false if it was already present
    pub fn add_seller(&mut self, addr: String) -> bool {
        if self.sellers.contains(&addr) {
            return false;
        }
        self.sellers.push(addr);
        true
    }

    /// Remove a seller address; returns false if it was not present
    pub fn remove_seller(&mut self, addr: &str) -> bool {
        let before = self.sellers.len();
        self.sellers.retain(|s| s != addr);
        self.sellers.len() != before
    }

    /// Set a config value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "listen_port" => {
                self.listen_port = value.parse().context("Invalid port number")?;
            }
            "read_timeout_secs" => {
                let secs: u64 = value.parse().context("Invalid number")?;
                if secs == 0 {
                    anyhow::bail!("read_timeout_secs must be at least 1");
                }
                self.read_timeout_secs = secs;
            }
            "private_key_hex" => {
                self.private_key_hex = if value.is_empty() {
                    None
                } else {
                    sensorlink_core::overrides::keypair_from_private_key(value)
                        .context("Invalid private key")?;
                    Some(value.to_string())
                };
            }
            "use_default_overrides" => {
                self.use_default_overrides = value.parse().context("Invalid boolean value")?;
            }
            "output" => {
                self.output = value.parse()?;
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Get a config value
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "listen_port" => Some(self.listen_port.to_string()),
            "read_timeout_secs" => Some(self.read_timeout_secs.to_string()),
            "private_key_hex" => self.private_key_hex.as_ref().map(|_| "(set)".to_string()),
            "use_default_overrides" => Some(self.use_default_overrides.to_string()),
            "output" => Some(self.output.to_string()),
            _ => None,
        }
    }

    /// List all config values
    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            ("listen_port".to_string(), self.listen_port.to_string()),
            ("read_timeout_secs".to_string(), format!("{}s", self.read_timeout_secs)),
            (
                "private_key_hex".to_string(),
                self.get("private_key_hex").unwrap_or_else(|| "(random)".to_string()),
            ),
            ("use_default_overrides".to_string(), self.use_default_overrides.to_string()),
            ("location_overrides".to_string(), self.location_overrides.len().to_string()),
            ("output".to_string(), self.output.to_string()),
            ("sellers".to_string(), self.sellers.len().to_string()),
        ]
    }

    /// Build the effective override table: shipped sites, then configured entries.
    pub fn build_overrides(&self) -> LocationOverrides {
        let mut entries: Vec<(&str, SensorLocation)> = Vec::new();
        if self.use_default_overrides {
            for &(public_key, location) in DEFAULT_OVERRIDES {
                entries.push((public_key, location));
            }
        }
        for entry in &self.location_overrides {
            entries.push((
                entry.public_key.as_str(),
                SensorLocation::new(entry.lat, entry.lon, entry.alt),
            ));
        }

        LocationOverrides::from_public_keys(entries)
    }
}
