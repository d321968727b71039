//! Call log module - structured per-call events and their sinks.
//!
//! Every [`Session::call`](crate::Session::call) collects an ordered
//! [`LogBatch`] (preparation, call, raw response, response, response array,
//! error) and hands it to each configured [`LogSink`] once, on success and on
//! failure alike.
//!
//! # Example
//!
//! ```
//! use d3_connector::log::{LogBatch, LogSink, LogTitle, WriterSink};
//!
//! let mut batch = LogBatch::new("GETCUST");
//! batch.push(LogTitle::Call, serde_json::json!(["4", "GETCUST", "1", "123"]));
//!
//! let sink = WriterSink::new(Vec::new());
//! sink.record(&batch);
//! let text = String::from_utf8(sink.into_inner()).unwrap();
//! assert!(text.starts_with("Call D3"));
//! ```

mod event;
mod format;
mod sink;

pub use event::{LogBatch, LogEvent, LogTitle, TIMESTAMP_FORMAT};
pub use format::{DetailFormatter, DetailMode, LogFormatter, TimerFormatter, DEFAULT_MAX_LEN};
pub use sink::{LogSink, MemorySink, TracingSink, WriterSink};
