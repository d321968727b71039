//! Raw connection settings and their providers.
//!
//! Settings are read from a structured source (TOML by default):
//!
//! ```toml
//! active = true
//!
//! [server]
//! host = "d3.example.net"
//! mainport = "9000"
//!
//! [server.timeout]
//! main = 5
//! child = 5
//! io = 60
//! ```
//!
//! Every field is optional at this layer; presence is checked when the
//! settings are turned into a [`ServerConfig`](super::ServerConfig).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{D3Error, Result};

/// Source of connection settings for a session.
///
/// Implementations are consulted once per session, the first time it needs
/// to connect.
pub trait SettingsProvider: Send + Sync {
    /// Load the current settings.
    fn settings(&self) -> Result<Settings>;
}

/// Connection settings as written in the configuration source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether connections are enabled at all.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Dispatcher location and timeouts.
    #[serde(default)]
    pub server: Option<ServerSettings>,
}

/// `[server]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Dispatcher host name or address.
    #[serde(default)]
    pub host: Option<String>,
    /// Dispatcher port, as a numeric string or integer.
    #[serde(default, deserialize_with = "port_field")]
    pub mainport: Option<String>,
    /// Timeouts block.
    #[serde(default)]
    pub timeout: Option<TimeoutSettings>,
}

/// `[server.timeout]` section, in seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    /// Connect timeout for the dispatcher port.
    #[serde(default)]
    pub main: Option<u64>,
    /// Connect timeout for the line port.
    #[serde(default)]
    pub child: Option<u64>,
    /// Per-call I/O timeout.
    #[serde(default)]
    pub io: Option<u64>,
}

fn default_active() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortField {
    Number(u64),
    Text(String),
}

fn port_field<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<PortField>::deserialize(deserializer)?.map(|port| match port {
        PortField::Number(n) => n.to_string(),
        PortField::Text(s) => s,
    }))
}

impl Settings {
    /// Settings for `host:mainport` with default timeouts.
    pub fn new(host: impl Into<String>, mainport: u16) -> Self {
        Self {
            active: true,
            server: Some(ServerSettings {
                host: Some(host.into()),
                mainport: Some(mainport.to_string()),
                timeout: Some(TimeoutSettings::default()),
            }),
        }
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| D3Error::Configuration(format!("failed to parse settings: {e}")))
    }
}

/// Settings held in memory.
#[derive(Debug, Clone)]
pub struct StaticSettings(pub Settings);

impl SettingsProvider for StaticSettings {
    fn settings(&self) -> Result<Settings> {
        Ok(self.0.clone())
    }
}

/// Settings read from a TOML file on each load.
#[derive(Debug, Clone)]
pub struct TomlFileSettings {
    path: PathBuf,
}

impl TomlFileSettings {
    /// Create a provider for the given file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsProvider for TomlFileSettings {
    fn settings(&self) -> Result<Settings> {
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            D3Error::Configuration(format!("failed to read {}: {e}", self.path.display()))
        })?;
        toml::from_str(&contents).map_err(|e| {
            D3Error::Configuration(format!("failed to parse {}: {e}", self.path.display()))
        })
    }
}
