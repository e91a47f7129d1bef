use std::sync::Mutex;

/// Sink for human-readable orchestration progress.
///
/// Injected into the [`Orchestrator`](crate::Orchestrator) so runs can be
/// observed without a process-wide logger.
pub trait RunLogger {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards run progress to `tracing` events under the `devstack::run` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl RunLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "devstack::run", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "devstack::run", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "devstack::run", "{message}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}

/// Keeps every logged line in memory.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<LogLine>>,
}

impl RecordingLogger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded lines.
    #[must_use]
    pub fn lines(&self) -> Vec<LogLine> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Messages recorded at the given level.
    #[must_use]
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.level == level)
            .map(|line| line.message)
            .collect()
    }

    fn push(&self, level: LogLevel, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(LogLine {
                level,
                message: message.to_string(),
            });
        }
    }
}

impl RunLogger for RecordingLogger {
    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }
}

impl<L: RunLogger + ?Sized> RunLogger for std::sync::Arc<L> {
    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn warn(&self, message: &str) {
        (**self).warn(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}
