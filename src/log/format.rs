//! Text formatters for call log batches.
//!
//! - [`DetailFormatter`] renders request and reply contents, filtered by a
//!   [`DetailMode`] and optionally truncated.
//! - [`TimerFormatter`] renders only titles, timestamps and the routine name,
//!   for following call latency.

use serde_json::Value as Json;

use super::event::{LogBatch, LogEvent, LogTitle};

/// Default cap on one rendered event, in characters.
pub const DEFAULT_MAX_LEN: usize = 250;

const ELLIPSIS: &str = " . . .";

/// Renders a batch to text.
pub trait LogFormatter: Send + Sync {
    fn format(&self, batch: &LogBatch) -> String;
}

/// Which events a [`DetailFormatter`] renders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetailMode {
    /// Call, response array and error.
    #[default]
    Standard,
    /// Standard plus preparation.
    Preparation,
    /// Standard plus raw response.
    Raw,
}

impl DetailMode {
    /// Check if events with `title` are rendered in this mode.
    pub fn includes(self, title: LogTitle) -> bool {
        match title {
            LogTitle::Call | LogTitle::ResponseArray | LogTitle::Error => true,
            LogTitle::Preparation => self == DetailMode::Preparation,
            LogTitle::RawResponse => self == DetailMode::Raw,
            LogTitle::Response => false,
        }
    }
}

/// Detailed formatter.
#[derive(Debug, Clone, Copy)]
pub struct DetailFormatter {
    mode: DetailMode,
    max_len: Option<usize>,
    field_len: Option<usize>,
}

impl Default for DetailFormatter {
    fn default() -> Self {
        Self::new(DetailMode::Standard)
    }
}

impl DetailFormatter {
    /// Create a formatter with the default event cap and no field cap.
    pub fn new(mode: DetailMode) -> Self {
        Self {
            mode,
            max_len: Some(DEFAULT_MAX_LEN),
            field_len: None,
        }
    }

    /// Cap on one rendered event; `None` disables it.
    pub fn max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len;
        self
    }

    /// Cap on each string field of call and response bodies.
    pub fn field_len(mut self, field_len: Option<usize>) -> Self {
        self.field_len = field_len;
        self
    }

    pub fn mode(&self) -> DetailMode {
        self.mode
    }

    fn format_event(&self, event: &LogEvent) -> String {
        let header = format!("{} D3  ({}):\n\n", event.title, event.formatted_timestamp());

        let body = match event.title {
            LogTitle::Preparation => render_preparation(&event.body),
            LogTitle::Call | LogTitle::Response => {
                render_elements(&self.truncated(&event.body))
            }
            LogTitle::ResponseArray => {
                serde_json::to_string_pretty(&self.truncated(&event.body)).unwrap_or_default()
            }
            LogTitle::RawResponse | LogTitle::Error => event.body_text(),
        };

        let mut rendered = header + &body;
        if let Some(limit) = self.max_len {
            if rendered.chars().count() > limit {
                rendered = format!("{}{}\n", prefix_chars(&rendered, limit), ELLIPSIS);
            }
        }
        rendered + &footer()
    }

    fn truncated(&self, body: &Json) -> Json {
        let mut body = body.clone();
        if let Some(limit) = self.field_len {
            truncate_fields(&mut body, limit);
        }
        body
    }
}

impl LogFormatter for DetailFormatter {
    fn format(&self, batch: &LogBatch) -> String {
        batch
            .events
            .iter()
            .filter(|e| self.mode.includes(e.title))
            .map(|e| self.format_event(e))
            .collect()
    }
}

/// Latency formatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerFormatter;

impl LogFormatter for TimerFormatter {
    fn format(&self, batch: &LogBatch) -> String {
        let mut out = String::new();
        for event in &batch.events {
            let ts = event.formatted_timestamp();
            match event.title {
                LogTitle::Preparation => {
                    out.push_str(&format!("{} D3 ({}):\n", event.title, ts));
                    out.push_str(&render_preparation(&event.body));
                }
                LogTitle::Call | LogTitle::ResponseArray => {
                    out.push_str(&format!("{} D3 ({}): {}\n", event.title, ts, batch.routine));
                }
                LogTitle::Error => {
                    out.push_str(&format!("{} D3 ({}): {}\n", event.title, ts, batch.routine));
                    out.push_str(&event.body_text());
                    out.push('\n');
                }
                LogTitle::RawResponse | LogTitle::Response => {}
            }
        }
        if !out.is_empty() {
            out.push_str(&footer());
        }
        out
    }
}

fn footer() -> String {
    format!("\n{}\n", "-".repeat(10))
}

fn render_preparation(body: &Json) -> String {
    let mut out = String::new();
    for key in ["settings", "socket"] {
        if let Some(text) = body.get(key).and_then(Json::as_str) {
            out.push_str(text);
            out.push('\n');
        }
    }
    out
}

/// One line per top-level element: scalars as ` - x`, lists as numbered
/// `<001> ` entries with deeper levels joined by ` ] ` and `\`.
fn render_elements(body: &Json) -> String {
    let Json::Array(params) = body else {
        return String::new();
    };

    let mut out = String::new();
    for param in params {
        match param {
            Json::Array(elements) => {
                let lines: Vec<String> = elements
                    .iter()
                    .enumerate()
                    .map(|(i, element)| format!("<{:03}> {}", i + 1, render_element(element)))
                    .collect();
                out.push_str(&lines.join("\n"));
            }
            scalar => {
                out.push_str(" - ");
                out.push_str(&scalar_text(scalar));
            }
        }
        out.push('\n');
    }
    out
}

fn render_element(element: &Json) -> String {
    match element {
        Json::Array(values) => values
            .iter()
            .map(|value| match value {
                Json::Array(sub) => sub.iter().map(scalar_text).collect::<Vec<_>>().join("\\"),
                scalar => scalar_text(scalar),
            })
            .collect::<Vec<_>>()
            .join(" ] "),
        scalar => scalar_text(scalar),
    }
}

fn scalar_text(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}

fn truncate_fields(value: &mut Json, limit: usize) {
    match value {
        Json::String(s) if s.chars().count() > limit => {
            *s = format!("{}{}", prefix_chars(s, limit), ELLIPSIS);
        }
        Json::Array(items) => items.iter_mut().for_each(|v| truncate_fields(v, limit)),
        Json::Object(map) => map.values_mut().for_each(|v| truncate_fields(v, limit)),
        _ => {}
    }
}

fn prefix_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
