//! Diagnostic logging for the client core.
//!
//! The core never writes to stdout itself. It hands free-text messages to a
//! host-supplied [`LogSink`] through a [`Logger`] that is gated by the
//! configuration's `debug` flag and silenced for good once the owning client
//! is disposed.

mod formatter;
mod ring_buffer;

pub use formatter::LogFormatter;
pub use ring_buffer::LogRingBuffer;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}

/// Host hook receiving diagnostic messages.
pub trait LogSink: Send + Sync {
    fn log(&self, entry: LogEntry);
}

/// Forwards messages to `tracing` under the `openctx` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, entry: LogEntry) {
        tracing::debug!(target: "openctx", "{}", entry.message);
    }
}

/// Keeps recent messages in memory for hosts that display them.
#[derive(Debug, Default)]
pub struct MemorySink {
    buffer: Mutex<LogRingBuffer>,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(LogRingBuffer::new(capacity)),
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).all()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|entry| entry.message).collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, entry: LogEntry) {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).push(entry);
    }
}

/// Cheaply cloneable, runtime-switchable logger shared by every component of
/// one client.
#[derive(Clone)]
pub struct Logger {
    debug: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    sink: Arc<dyn LogSink>,
    formatter: Arc<LogFormatter>,
}

impl Logger {
    /// A logger that starts disabled until `set_debug(true)`.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            debug: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
            sink,
            formatter: Arc::new(LogFormatter::new()),
        }
    }

    /// A logger that never emits anything.
    pub fn disabled() -> Self {
        let logger = Self::new(Arc::new(TracingSink));
        logger.close();
        logger
    }

    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.debug.load(Ordering::Relaxed) && !self.closed.load(Ordering::Acquire)
    }

    /// Permanently silence this logger and all of its clones.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn log(&self, message: impl fmt::Display) {
        if !self.is_enabled() {
            return;
        }
        let formatted = self.formatter.format(&message.to_string());
        self.sink.log(LogEntry::new(formatted));
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("debug", &self.debug.load(Ordering::Relaxed))
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
