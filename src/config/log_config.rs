use log::LevelFilter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// One of off, error, warn, info, debug, trace. `RUST_LOG` takes precedence.
    pub level: String,
    /// Forward log records to in-process subscribers such as a log pane
    pub forward_to_subscribers: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            forward_to_subscribers: true,
        }
    }
}

impl LogConfig {
    pub fn level_filter(&self) -> LevelFilter {
        std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| level.parse().ok())
            .or_else(|| self.level.parse().ok())
            .unwrap_or(LevelFilter::Info)
    }
}
