//! Log sinks.

use std::io::Write;
use std::sync::Mutex;

use super::event::LogBatch;
use super::format::{DetailFormatter, LogFormatter};

/// Receives the event batch of every call, successful or not.
pub trait LogSink: Send + Sync {
    fn record(&self, batch: &LogBatch);
}

/// Forwards each event as a `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, batch: &LogBatch) {
        for event in &batch.events {
            tracing::info!(
                target: "d3_connector::call",
                routine = %batch.routine,
                title = %event.title,
                timestamp = %event.formatted_timestamp(),
                body = %event.body,
            );
        }
    }
}

/// Writes each batch through a formatter.
pub struct WriterSink<W, F = DetailFormatter> {
    writer: Mutex<W>,
    formatter: F,
}

impl<W: Write + Send> WriterSink<W, DetailFormatter> {
    /// Writer sink with the default detail formatter.
    pub fn new(writer: W) -> Self {
        Self::with_formatter(writer, DetailFormatter::default())
    }
}

impl<W: Write + Send, F: LogFormatter> WriterSink<W, F> {
    pub fn with_formatter(writer: W, formatter: F) -> Self {
        Self {
            writer: Mutex::new(writer),
            formatter,
        }
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send, F: LogFormatter> LogSink for WriterSink<W, F> {
    fn record(&self, batch: &LogBatch) {
        let text = self.formatter.format(batch);
        if text.is_empty() {
            return;
        }
        let mut writer = match self.writer.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writer.write_all(text.as_bytes()).and_then(|_| writer.flush()) {
            tracing::warn!("failed to write call log: {}", e);
        }
    }
}

/// Keeps batches in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<LogBatch>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every batch recorded so far.
    pub fn batches(&self) -> Vec<LogBatch> {
        match self.batches.lock() {
            Ok(b) => b.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Remove and return every batch recorded so far.
    pub fn take(&self) -> Vec<LogBatch> {
        match self.batches.lock() {
            Ok(mut b) => std::mem::take(&mut *b),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl LogSink for MemorySink {
    fn record(&self, batch: &LogBatch) {
        match self.batches.lock() {
            Ok(mut b) => b.push(batch.clone()),
            Err(poisoned) => poisoned.into_inner().push(batch.clone()),
        }
    }
}
