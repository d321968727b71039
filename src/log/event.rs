//! Per-call log events.

use std::fmt;

use chrono::{DateTime, Local};
use serde_json::Value as Json;

/// Timestamp layout used when rendering events.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Kind of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTitle {
    /// Connection setup: settings load and socket timeline.
    Preparation,
    /// Request as sent.
    Call,
    /// Reply payload before decoding.
    RawResponse,
    /// Decoded reply.
    Response,
    /// Decoded reply as returned to the caller.
    ResponseArray,
    /// Failure of the call.
    Error,
}

impl LogTitle {
    /// Human-readable title.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTitle::Preparation => "Preparation",
            LogTitle::Call => "Call",
            LogTitle::RawResponse => "Raw Response",
            LogTitle::Response => "Response",
            LogTitle::ResponseArray => "Response Array",
            LogTitle::Error => "Error",
        }
    }
}

impl fmt::Display for LogTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a call's log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub title: LogTitle,
    pub body: Json,
    pub timestamp: DateTime<Local>,
}

impl LogEvent {
    /// Create an event stamped with the current local time.
    pub fn new(title: LogTitle, body: impl Into<Json>) -> Self {
        Self {
            title,
            body: body.into(),
            timestamp: Local::now(),
        }
    }

    /// Timestamp rendered with [`TIMESTAMP_FORMAT`].
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Body as display text: strings verbatim, anything else as JSON.
    pub fn body_text(&self) -> String {
        match &self.body {
            Json::String(s) => s.clone(),
            Json::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Ordered events of one call, handed to each sink once.
#[derive(Debug, Clone, PartialEq)]
pub struct LogBatch {
    pub routine: String,
    pub events: Vec<LogEvent>,
}

impl LogBatch {
    /// Start an empty batch for `routine`.
    pub fn new(routine: impl Into<String>) -> Self {
        Self {
            routine: routine.into(),
            events: Vec::new(),
        }
    }

    /// Append an event stamped now.
    pub fn push(&mut self, title: LogTitle, body: impl Into<Json>) {
        self.events.push(LogEvent::new(title, body));
    }

    /// Titles in order.
    pub fn titles(&self) -> Vec<LogTitle> {
        self.events.iter().map(|e| e.title).collect()
    }

    /// First event with the given title.
    pub fn find(&self, title: LogTitle) -> Option<&LogEvent> {
        self.events.iter().find(|e| e.title == title)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
