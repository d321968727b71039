//! Validated server configuration.

use std::time::Duration;

use super::settings::Settings;
use crate::error::{D3Error, Result};

/// Default connect timeout for the dispatcher port.
pub const DEFAULT_MAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default connect timeout for the line port.
pub const DEFAULT_CHILD_TIMEOUT: Duration = Duration::from_secs(5);

/// Default per-call I/O timeout.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(60);

/// Session timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Dispatcher connect and line reply.
    pub main: Duration,
    /// Line connect.
    pub child: Duration,
    /// Each read/write of a call, and the call as a whole.
    pub io: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            main: DEFAULT_MAIN_TIMEOUT,
            child: DEFAULT_CHILD_TIMEOUT,
            io: DEFAULT_IO_TIMEOUT,
        }
    }
}

/// Everything a session needs to reach the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Dispatcher host.
    pub host: String,
    /// Dispatcher port.
    pub main_port: u16,
    /// Timeouts.
    pub timeouts: Timeouts,
}

impl ServerConfig {
    /// Validate raw settings.
    ///
    /// # Errors
    ///
    /// Returns [`D3Error::Configuration`] if connections are disabled, or the
    /// host, main port or timeout block is missing or invalid.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if !settings.active {
            return Err(D3Error::Configuration(
                "connections are disabled (active = false)".to_string(),
            ));
        }

        let server = settings
            .server
            .as_ref()
            .ok_or_else(|| missing("[server] section"))?;

        let host = server
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| missing("server.host"))?;

        let mainport = server
            .mainport
            .as_deref()
            .ok_or_else(|| missing("server.mainport"))?;
        let main_port = mainport.trim().parse::<u16>().map_err(|_| {
            D3Error::Configuration(format!("invalid server.mainport {:?}", mainport))
        })?;

        let timeout = server
            .timeout
            .as_ref()
            .ok_or_else(|| missing("[server.timeout] section"))?;
        let defaults = Timeouts::default();
        let timeouts = Timeouts {
            main: timeout.main.map_or(defaults.main, Duration::from_secs),
            child: timeout.child.map_or(defaults.child, Duration::from_secs),
            io: timeout.io.map_or(defaults.io, Duration::from_secs),
        };

        Ok(Self {
            host: host.to_string(),
            main_port,
            timeouts,
        })
    }
}

fn missing(what: &str) -> D3Error {
    D3Error::Configuration(format!("missing {}", what))
}
