//! Configuration module - settings providers and validation.
//!
//! A [`SettingsProvider`] supplies raw [`Settings`]; a session validates them
//! into a [`ServerConfig`] the first time it needs to connect.
//!
//! # Example
//!
//! ```
//! use d3_connector::config::{ServerConfig, Settings};
//!
//! let settings = Settings::from_toml_str(r#"
//!     [server]
//!     host = "d3.example.net"
//!     mainport = "9000"
//!     [server.timeout]
//!     io = 30
//! "#).unwrap();
//!
//! let config = ServerConfig::from_settings(&settings).unwrap();
//! assert_eq!(config.main_port, 9000);
//! assert_eq!(config.timeouts.io.as_secs(), 30);
//! ```

mod server;
mod settings;

pub use server::{
    ServerConfig, Timeouts, DEFAULT_CHILD_TIMEOUT, DEFAULT_IO_TIMEOUT, DEFAULT_MAIN_TIMEOUT,
};
pub use settings::{
    ServerSettings, Settings, SettingsProvider, StaticSettings, TimeoutSettings, TomlFileSettings,
};
