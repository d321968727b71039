//! Session builder and call lifecycle.
//!
//! The [`SessionBuilder`] wires a settings provider, log sinks and the wire
//! charset into a [`Session`]. The session owns one line at a time:
//! 1. Load and validate settings (once)
//! 2. Ask the dispatcher for a line port
//! 3. Connect to the line
//! 4. Exchange framed calls over it until a failed exchange drops it
//!
//! # Example
//!
//! ```no_run
//! use d3_connector::config::TomlFileSettings;
//! use d3_connector::{Session, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::builder()
//!         .settings(TomlFileSettings::new("d3.toml"))
//!         .build()?;
//!
//!     let customer = session.call("GETCUST", vec![Value::from("123")]).await?;
//!     println!("{:?}", customer);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use bytes::Bytes;
use chrono::Local;
use serde_json::json;
use tokio::net::TcpStream;

use crate::codec::{Charset, DelimiterCodec, Value};
use crate::config::{ServerConfig, SettingsProvider};
use crate::error::{D3Error, Result};
use crate::log::{LogBatch, LogEvent, LogSink, LogTitle, TIMESTAMP_FORMAT};
use crate::protocol::{bounded, exchange, parse_line_port, read_line_reply, CALL_TAG};
use crate::structure::{build, Structure};

/// A typed request object: a routine name and its positional parameters.
pub trait D3Request {
    /// Name of the D3 routine to run.
    fn routine_name(&self) -> &str;

    /// Parameters in wire order.
    fn params(&self) -> Vec<Value>;
}

/// Connection state of a [`Session`], without the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Settings not loaded yet.
    Unconfigured,
    /// Settings loaded, no line held.
    Configured,
    /// Holding a line on the given port.
    Connected { line: u16 },
}

enum State {
    Unconfigured,
    Configured(ServerConfig),
    Connected {
        config: ServerConfig,
        line: u16,
        stream: TcpStream,
    },
}

/// Builder for configuring and creating a [`Session`].
pub struct SessionBuilder {
    settings: Option<Arc<dyn SettingsProvider>>,
    sinks: Vec<Arc<dyn LogSink>>,
    extended_log: bool,
    charset: Charset,
}

impl SessionBuilder {
    /// Create a new session builder.
    pub fn new() -> Self {
        Self {
            settings: None,
            sinks: Vec::new(),
            extended_log: false,
            charset: Charset::default(),
        }
    }

    /// Set where connection settings come from.
    pub fn settings(mut self, provider: impl SettingsProvider + 'static) -> Self {
        self.settings = Some(Arc::new(provider));
        self
    }

    /// Add a sink for per-call log batches. May be called more than once.
    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Also log the raw reply and the decoded response of every call.
    pub fn extended_log(mut self, enabled: bool) -> Self {
        self.extended_log = enabled;
        self
    }

    /// Wire charset (default: Latin-1).
    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Build the session. Settings are not read until the first connect.
    ///
    /// # Errors
    ///
    /// Returns [`D3Error::Configuration`] if no settings provider was set.
    pub fn build(self) -> Result<Session> {
        let settings = self
            .settings
            .ok_or_else(|| D3Error::Configuration("no settings provider".to_string()))?;

        Ok(Session {
            settings,
            sinks: self.sinks,
            extended_log: self.extended_log,
            codec: DelimiterCodec::new(self.charset),
            state: State::Unconfigured,
            preparation: None,
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Client session holding at most one D3 line.
///
/// One call at a time: every operation takes `&mut self`. Run one session
/// per worker for concurrent calls.
pub struct Session {
    settings: Arc<dyn SettingsProvider>,
    sinks: Vec<Arc<dyn LogSink>>,
    extended_log: bool,
    codec: DelimiterCodec,
    state: State,
    /// Setup record of the last `open`, emitted with the next call's batch.
    preparation: Option<LogEvent>,
}

impl Session {
    /// Create a new session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Session with default logging and charset.
    pub fn new(provider: impl SettingsProvider + 'static) -> Self {
        Self {
            settings: Arc::new(provider),
            sinks: Vec::new(),
            extended_log: false,
            codec: DelimiterCodec::default(),
            state: State::Unconfigured,
            preparation: None,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> SessionState {
        match &self.state {
            State::Unconfigured => SessionState::Unconfigured,
            State::Configured(_) => SessionState::Configured,
            State::Connected { line, .. } => SessionState::Connected { line: *line },
        }
    }

    /// Check if a line is held.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, State::Connected { .. })
    }

    /// Port of the held line.
    pub fn line(&self) -> Option<u16> {
        match &self.state {
            State::Connected { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Validated settings, once loaded.
    pub fn config(&self) -> Option<&ServerConfig> {
        match &self.state {
            State::Unconfigured => None,
            State::Configured(config) | State::Connected { config, .. } => Some(config),
        }
    }

    /// Codec used for requests and replies.
    pub fn codec(&self) -> DelimiterCodec {
        self.codec
    }

    /// Load and validate settings if not done yet.
    ///
    /// # Errors
    ///
    /// Returns [`D3Error::Configuration`] if the provider fails or the settings
    /// are disabled, incomplete or invalid. The session stays unconfigured.
    pub fn ensure_configured(&mut self) -> Result<&ServerConfig> {
        if let State::Unconfigured = self.state {
            let settings = self.settings.settings()?;
            let config = ServerConfig::from_settings(&settings)?;
            tracing::debug!(host = %config.host, port = config.main_port, "settings loaded");
            self.state = State::Configured(config);
        }

        match &self.state {
            State::Configured(config) | State::Connected { config, .. } => Ok(config),
            State::Unconfigured => Err(D3Error::Configuration(
                "settings not loaded".to_string(),
            )),
        }
    }

    /// Negotiate a line with the dispatcher and connect to it.
    ///
    /// A line already held is dropped first.
    ///
    /// # Errors
    ///
    /// - [`D3Error::Configuration`] from [`ensure_configured`](Self::ensure_configured)
    /// - [`D3Error::Connectivity`] if the dispatcher is unreachable, has no
    ///   free line, or the line cannot be reached
    pub async fn open(&mut self) -> Result<()> {
        let config = self.ensure_configured()?.clone();
        self.close();

        let mut timeline = vec!["SOCKET:".to_string()];
        let result = negotiate_line(&config, &mut timeline).await;

        self.preparation = Some(LogEvent::new(
            LogTitle::Preparation,
            json!({
                "settings": format!("SETTINGS: {}:{}", config.host, config.main_port),
                "socket": timeline.join("\n\t"),
            }),
        ));

        let (line, stream) = result?;
        tracing::debug!(line, "line acquired");
        self.state = State::Connected {
            config,
            line,
            stream,
        };
        Ok(())
    }

    /// Drop the held line, keeping the loaded settings.
    pub fn close(&mut self) {
        self.state = match std::mem::replace(&mut self.state, State::Unconfigured) {
            State::Connected { config, line, .. } => {
                tracing::debug!(line, "line released");
                State::Configured(config)
            }
            other => other,
        };
    }

    /// Send one encoded request over the held line and return the reply payload.
    ///
    /// # Errors
    ///
    /// - [`D3Error::NotConnected`] if no line is held
    /// - [`D3Error::Validation`] if `payload` is empty
    /// - [`D3Error::Timeout`] after the whole reply arrived; the line is kept
    /// - [`D3Error::Timeout`] during a read or write, [`D3Error::Protocol`] or
    ///   [`D3Error::Io`]; the line is dropped, since it may still hold part of
    ///   the reply (see [`D3Error::drops_line`])
    pub async fn send(&mut self, payload: &[u8]) -> Result<Bytes> {
        let State::Connected { config, stream, .. } = &mut self.state else {
            return Err(D3Error::NotConnected);
        };
        let io_timeout = config.timeouts.io;

        match exchange(stream, payload, io_timeout).await {
            Err(e) if e.drops_line() => {
                tracing::warn!("line unusable, resetting session: {}", e);
                self.close();
                Err(e)
            }
            other => other,
        }
    }

    /// Call `routine` with `params` and return the reply fields.
    ///
    /// The echoed tag and the trailing terminator are stripped from the reply.
    /// Opens a line first if none is held. The call's log batch goes to every
    /// sink whether the call succeeds or not.
    ///
    /// # Errors
    ///
    /// - [`D3Error::Validation`] if `routine` or `params` is empty, or a
    ///   parameter nests too deep
    /// - anything [`open`](Self::open) or [`send`](Self::send) returns
    pub async fn call(&mut self, routine: &str, params: Vec<Value>) -> Result<Vec<Value>> {
        let mut batch = LogBatch::new(routine);
        let result = self.call_logged(routine, params, &mut batch).await;

        if let Err(e) = &result {
            tracing::warn!(routine, "call failed: {}", e);
            batch.push(LogTitle::Error, format!("({:?}) {}", e.kind(), e));
        }
        if let Some(preparation) = self.preparation.take() {
            batch.events.insert(0, preparation);
        }
        for sink in &self.sinks {
            sink.record(&batch);
        }

        result
    }

    /// Call a typed request.
    pub async fn call_request<R: D3Request + ?Sized>(&mut self, request: &R) -> Result<Vec<Value>> {
        self.call(request.routine_name(), request.params()).await
    }

    /// Call `routine` and build the reply fields against `structure`.
    ///
    /// # Errors
    ///
    /// Anything [`call`](Self::call) returns, or [`D3Error::Schema`] if the
    /// reply does not match.
    pub async fn call_structured(
        &mut self,
        routine: &str,
        params: Vec<Value>,
        structure: &Structure,
    ) -> Result<serde_json::Value> {
        let fields = self.call(routine, params).await?;
        build(&Value::List(fields), structure)
    }

    async fn call_logged(
        &mut self,
        routine: &str,
        params: Vec<Value>,
        batch: &mut LogBatch,
    ) -> Result<Vec<Value>> {
        if routine.is_empty() {
            return Err(D3Error::Validation("missing routine name".to_string()));
        }
        if params.is_empty() {
            return Err(D3Error::Validation("missing routine parameters".to_string()));
        }

        let mut items = Vec::with_capacity(params.len() + 3);
        items.push(Value::from(CALL_TAG));
        items.push(Value::from(routine));
        items.push(Value::from(params.len()));
        items.extend(params);
        let request = Value::List(items);
        let payload = self.codec.encode(&request)?;

        if !self.is_connected() {
            self.open().await?;
        }

        batch.push(LogTitle::Call, request.to_json());
        let reply = self.send(&payload).await?;
        if self.extended_log {
            batch.push(LogTitle::RawResponse, self.codec.charset().from_wire(&reply));
        }

        let mut fields = self.codec.decode(&reply).into_list();
        if !fields.is_empty() {
            fields.remove(0);
        }
        fields.pop();

        let response = Value::List(fields);
        let json = response.to_json();
        if self.extended_log {
            batch.push(LogTitle::Response, json.clone());
        }
        batch.push(LogTitle::ResponseArray, json);

        Ok(response.into_list())
    }
}

async fn negotiate_line(
    config: &ServerConfig,
    timeline: &mut Vec<String>,
) -> Result<(u16, TcpStream)> {
    let timeouts = config.timeouts;
    let started = stamp();

    let connected = bounded(
        timeouts.main,
        TcpStream::connect((config.host.as_str(), config.main_port)),
    )
    .await;
    let mut dispatcher = match connected {
        Ok(stream) => stream,
        Err(e) => {
            tracing::debug!("dispatcher connect failed: {}", e);
            timeline.push(format!("({} -> {}) dispatcher unreachable", started, stamp()));
            return Err(D3Error::Connectivity(
                "cannot establish connection".to_string(),
            ));
        }
    };
    let opened = stamp();
    timeline.push(format!("({} -> {}) dispatcher socket", started, opened));

    let reply = read_line_reply(&mut dispatcher, timeouts.main).await;
    drop(dispatcher);

    let Some(reply) = reply else {
        timeline.push(format!("({} -> {}) no lines available", opened, stamp()));
        return Err(D3Error::Connectivity("no lines available".to_string()));
    };
    let replied = stamp();

    let Some(line) = parse_line_port(&reply) else {
        tracing::debug!(reply = ?String::from_utf8_lossy(&reply), "unparsable line reply");
        timeline.push(format!("({} -> {}) invalid line reply", opened, replied));
        return Err(D3Error::Connectivity("cannot connect to line".to_string()));
    };

    match bounded(timeouts.child, TcpStream::connect((config.host.as_str(), line))).await {
        Ok(stream) => {
            timeline.push(format!("({} -> {}) line {}", replied, stamp(), line));
            Ok((line, stream))
        }
        Err(e) => {
            tracing::debug!(line, "line connect failed: {}", e);
            timeline.push(format!("({} -> {}) line {} unreachable", replied, stamp(), line));
            Err(D3Error::Connectivity("cannot connect to line".to_string()))
        }
    }
}

fn stamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}
