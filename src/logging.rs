//! Logger capability with a safe fallback.
//!
//! Callers never check whether a logger is bonded: [`logger`] hands back the
//! bonded one or a [`TracingLogger`] that forwards to `tracing`.

use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;

use crate::bond::keys;
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured logger bonded under `logger`.
pub trait Logger: Send + Sync + Debug {
    fn log(&self, level: LogLevel, message: &str, context: &Value);

    fn debug(&self, message: &str, context: &Value) {
        self.log(LogLevel::Debug, message, context);
    }

    fn info(&self, message: &str, context: &Value) {
        self.log(LogLevel::Info, message, context);
    }

    fn warn(&self, message: &str, context: &Value) {
        self.log(LogLevel::Warn, message, context);
    }

    fn error(&self, message: &str, context: &Value) {
        self.log(LogLevel::Error, message, context);
    }
}

/// Fallback logger emitting `tracing` events.
///
/// Silent until a subscriber is installed, stderr with the usual fmt
/// subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, context: &Value) {
        match level {
            LogLevel::Debug => tracing::debug!(%context, "{message}"),
            LogLevel::Info => tracing::info!(%context, "{message}"),
            LogLevel::Warn => tracing::warn!(%context, "{message}"),
            LogLevel::Error => tracing::error!(%context, "{message}"),
        }
    }
}

/// The bonded logger, or [`TracingLogger`] when none is bonded.
pub fn logger(registry: &Registry) -> Arc<dyn Logger> {
    registry
        .get(&keys::LOGGER)
        .unwrap_or_else(|| Arc::new(TracingLogger))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Logger capturing every entry, shared with other test modules.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingLogger {
        pub(crate) entries: Mutex<Vec<(LogLevel, String, Value)>>,
    }

    impl Logger for RecordingLogger {
        fn log(&self, level: LogLevel, message: &str, context: &Value) {
            self.entries
                .lock()
                .push((level, message.to_string(), context.clone()));
        }
    }

    #[test]
    fn test_fallback_when_unbonded() {
        let registry = Registry::new();
        // Must not panic without a subscriber.
        logger(&registry).error("boom", &json!({"k": 1}));
        assert!(!registry.is_bonded("logger"));
    }

    #[test]
    fn test_bonded_logger_receives_entries() {
        let registry = Registry::new();
        let recorder = Arc::new(RecordingLogger::default());
        registry.bond(&keys::LOGGER, recorder.clone());

        logger(&registry).warn("careful", &Value::Null);

        let entries = recorder.entries.lock();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, LogLevel::Warn);
        assert_eq!(entries[0].1, "careful");
    }
}
