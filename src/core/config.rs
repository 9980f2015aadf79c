// Configuration Management for Air Watch
// JSON file + environment overrides, validated before the pipeline starts

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::types::{default_entities, Entity};

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

// ============================================================================
// Configuration Structures
// ============================================================================

/// One rung of the alert ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThreshold {
    pub threshold: i32,
    pub severity: String,
    pub label: String,
    pub action: String,
}

impl AlertThreshold {
    pub fn new(threshold: i32, severity: &str, label: &str, action: &str) -> Self {
        Self {
            threshold,
            severity: severity.to_string(),
            label: label.to_string(),
            action: action.to_string(),
        }
    }
}

/// Default ladder, ascending by threshold
pub fn default_alert_thresholds() -> Vec<AlertThreshold> {
    vec![
        AlertThreshold::new(150, "WARNING", "🟠", "Elevated AQI. Limit outdoor activities."),
        AlertThreshold::new(200, "CRITICAL", "🔴", "High pollution. Vulnerable groups must stay indoors."),
        AlertThreshold::new(300, "EMERGENCY", "🚨", "Immediate action required. Industrial halt mandatory."),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tick_interval_ms: u64,
    pub window_size: usize,
    pub event_log_capacity: usize,

    // Valid value range, readings outside are clamped
    pub valid_min: i32,
    pub valid_max: i32,

    // Spike detection
    pub spike_ratio: f64,
    pub spike_lookback: usize,
    pub spike_min_history: usize,

    // Aggregation
    pub critical_threshold: i32,

    // Alert ladder, ascending
    pub alert_thresholds: Vec<AlertThreshold>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 5000,
            window_size: 20,
            event_log_capacity: 500,
            valid_min: 10,
            valid_max: 500,
            spike_ratio: 1.30,
            spike_lookback: 5,
            spike_min_history: 3,
            critical_threshold: 150,
            alert_thresholds: default_alert_thresholds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub mailbox_capacity: usize,
    pub heartbeat_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 100,
            heartbeat_interval_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub json_format: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
            json_format: false,
        }
    }
}

// ============================================================================
// Configuration Summary
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub entity_count: usize,
    pub tick_interval_ms: u64,
    pub window_size: usize,
    pub alert_tiers: usize,
    pub bind_addr: String,
    pub log_level: String,
}

// ============================================================================
// Configuration Manager
// ============================================================================

pub struct ConfigManager {
    pipeline: Arc<RwLock<PipelineConfig>>,
    stream: Arc<RwLock<StreamConfig>>,
    server: Arc<RwLock<ServerConfig>>,
    monitoring: Arc<RwLock<MonitoringConfig>>,
    entities: Arc<RwLock<Vec<Entity>>>,
}

impl ConfigManager {
    pub fn new(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut manager = Self {
            pipeline: Arc::new(RwLock::new(PipelineConfig::default())),
            stream: Arc::new(RwLock::new(StreamConfig::default())),
            server: Arc::new(RwLock::new(ServerConfig::default())),
            monitoring: Arc::new(RwLock::new(MonitoringConfig::default())),
            entities: Arc::new(RwLock::new(default_entities())),
        };

        if let Some(path) = config_path {
            manager.load_from_file(path)?;
        }

        manager.load_from_env();

        info!("Configuration initialized");
        Ok(manager)
    }

    /// Load configuration from JSON file. Missing sections keep their current values.
    pub fn load_from_file(&mut self, config_path: &str) -> Result<(), ConfigError> {
        let path = Path::new(config_path);
        if !path.exists() {
            warn!(path = config_path, "Config file not found");
            return Ok(());
        }

        let content = fs::read_to_string(path)?;
        let config_data: HashMap<String, serde_json::Value> = serde_json::from_str(&content)?;

        if let Some(data) = config_data.get("pipeline") {
            *self.pipeline.write() = serde_json::from_value(data.clone())?;
        }
        if let Some(data) = config_data.get("stream") {
            *self.stream.write() = serde_json::from_value(data.clone())?;
        }
        if let Some(data) = config_data.get("server") {
            *self.server.write() = serde_json::from_value(data.clone())?;
        }
        if let Some(data) = config_data.get("monitoring") {
            *self.monitoring.write() = serde_json::from_value(data.clone())?;
        }
        if let Some(data) = config_data.get("entities") {
            *self.entities.write() = serde_json::from_value(data.clone())?;
        }

        info!(path = config_path, "Configuration loaded");
        Ok(())
    }

    pub fn load_from_env(&mut self) {
        if let Ok(addr) = std::env::var("AIR_WATCH_BIND_ADDR") {
            self.server.write().bind_addr = addr;
        }
        if let Ok(level) = std::env::var("AIR_WATCH_LOG_LEVEL") {
            self.monitoring.write().log_level = level;
        }
        if let Ok(interval) = std::env::var("AIR_WATCH_TICK_INTERVAL_MS") {
            match interval.parse::<u64>() {
                Ok(ms) => self.pipeline.write().tick_interval_ms = ms,
                Err(_) => warn!(value = %interval, "Ignoring invalid AIR_WATCH_TICK_INTERVAL_MS"),
            }
        }
    }

    pub fn save_to_file(&self, config_path: &str) -> Result<(), ConfigError> {
        let mut config_map = HashMap::new();
        config_map.insert("pipeline", serde_json::to_value(&*self.pipeline.read())?);
        config_map.insert("stream", serde_json::to_value(&*self.stream.read())?);
        config_map.insert("server", serde_json::to_value(&*self.server.read())?);
        config_map.insert("monitoring", serde_json::to_value(&*self.monitoring.read())?);
        config_map.insert("entities", serde_json::to_value(&*self.entities.read())?);

        if let Some(parent) = Path::new(config_path).parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&config_map)?;
        fs::write(config_path, json)?;

        info!(path = config_path, "Configuration saved");
        Ok(())
    }

    /// Validate configuration, returning every problem found in one error
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let pipeline = self.pipeline.read();
        let stream = self.stream.read();
        let entities = self.entities.read();

        if entities.is_empty() {
            errors.push("at least one entity is required".to_string());
        }
        let mut seen = HashSet::new();
        for entity in entities.iter() {
            if !seen.insert(entity.id.as_str()) {
                errors.push(format!("duplicate entity id '{}'", entity.id));
            }
        }

        if pipeline.alert_thresholds.is_empty() {
            errors.push("alert_thresholds must not be empty".to_string());
        }
        if pipeline
            .alert_thresholds
            .windows(2)
            .any(|pair| pair[0].threshold >= pair[1].threshold)
        {
            errors.push("alert_thresholds must be strictly ascending".to_string());
        }
        if pipeline.valid_min >= pipeline.valid_max {
            errors.push("valid_min must be below valid_max".to_string());
        }
        if pipeline.window_size == 0 || pipeline.event_log_capacity == 0 {
            errors.push("window_size and event_log_capacity must be positive".to_string());
        }
        if pipeline.tick_interval_ms == 0 {
            errors.push("tick_interval_ms must be positive".to_string());
        }
        if pipeline.spike_ratio <= 1.0 {
            errors.push("spike_ratio must be greater than 1".to_string());
        }
        if pipeline.spike_lookback == 0 {
            errors.push("spike_lookback must be positive".to_string());
        }
        if stream.mailbox_capacity == 0 || stream.heartbeat_interval_ms == 0 {
            errors.push("mailbox_capacity and heartbeat_interval_ms must be positive".to_string());
        }

        if !errors.is_empty() {
            for error in &errors {
                warn!(error = %error, "Config validation error");
            }
            return Err(ConfigError::Validation(errors.join("; ")));
        }

        info!("Configuration validated successfully");
        Ok(())
    }

    pub fn get_summary(&self) -> ConfigSummary {
        let pipeline = self.pipeline.read();

        ConfigSummary {
            entity_count: self.entities.read().len(),
            tick_interval_ms: pipeline.tick_interval_ms,
            window_size: pipeline.window_size,
            alert_tiers: pipeline.alert_thresholds.len(),
            bind_addr: self.server.read().bind_addr.clone(),
            log_level: self.monitoring.read().log_level.clone(),
        }
    }

    // Getters for each config section
    pub fn pipeline(&self) -> PipelineConfig {
        self.pipeline.read().clone()
    }

    pub fn stream(&self) -> StreamConfig {
        self.stream.read().clone()
    }

    pub fn server(&self) -> ServerConfig {
        self.server.read().clone()
    }

    pub fn monitoring(&self) -> MonitoringConfig {
        self.monitoring.read().clone()
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.entities.read().clone()
    }

    pub fn set_pipeline(&self, pipeline: PipelineConfig) {
        *self.pipeline.write() = pipeline;
    }
}
