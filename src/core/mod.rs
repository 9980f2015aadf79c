// Core Module - Foundational types, config, logging, event log

pub mod types;
pub mod config;
pub mod logger;
pub mod events;

// Re-export commonly used items for convenience
pub use types::*;
pub use config::{
    AlertThreshold, PipelineConfig, StreamConfig, ServerConfig, MonitoringConfig,
    ConfigManager, ConfigSummary, ConfigError, default_alert_thresholds,
};
pub use logger::setup_logging;
pub use events::{EventLog, EventLevel, LogEntry, SPIKE_DETECTED, THRESHOLD_ALERT, PIPELINE_TICK};
