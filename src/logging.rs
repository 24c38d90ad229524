use std::sync::OnceLock;

use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::LogConfig;

const LOG_CHANNEL_CAPACITY: usize = 256;

static LOGGER: OnceLock<SessionLogger> = OnceLock::new();

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LogMessage {
    pub level: String,
    pub target: String,
    pub message: String,
    pub timestamp: String,
}

/// Writes records to stderr and forwards them to in-process subscribers, e.g. a log pane.
pub struct SessionLogger {
    level: LevelFilter,
    forward: bool,
    sender: broadcast::Sender<LogMessage>,
}

impl SessionLogger {
    pub fn new(level: LevelFilter, forward: bool) -> Self {
        let (sender, _) = broadcast::channel(LOG_CHANNEL_CAPACITY);
        Self { level, forward, sender }
    }

    /// Installs the logger as the global `log` backend.
    pub fn init(config: &LogConfig) -> Result<&'static SessionLogger, SetLoggerError> {
        let level = config.level_filter();
        let logger = LOGGER.get_or_init(|| SessionLogger::new(level, config.forward_to_subscribers));
        log::set_logger(logger).map(|()| log::set_max_level(level))?;
        Ok(logger)
    }

    /// Log records emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LogMessage> {
        self.sender.subscribe()
    }

    fn format(record: &Record) -> LogMessage {
        LogMessage {
            level: record.level().to_string(),
            target: record.target().to_string(),
            message: record.args().to_string(),
            timestamp: Local::now().to_rfc3339(),
        }
    }
}

impl log::Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let log_message = Self::format(record);
        eprintln!(
            "[{} {} {}] {}",
            log_message.timestamp, log_message.level, log_message.target, log_message.message
        );

        // No receivers is fine
        if self.forward {
            let _ = self.sender.send(log_message);
        }
    }

    fn flush(&self) {}
}
