// Streaming Pipeline - Fixed-cadence tick loop over every monitored entity
// Source -> History -> Transform -> Alert state -> Aggregate -> Event log -> Hub

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::core::config::PipelineConfig;
use crate::core::events::{EventLevel, EventLog, LogEntry, PIPELINE_TICK, SPIKE_DETECTED, THRESHOLD_ALERT};
use crate::core::types::{round1, AqiLevel, Entity, EntityCategory, Reading};
use crate::layer1::source::{ReadingSource, SourceError};
use crate::layer2::history::HistoryStore;
use crate::layer3::aggregator::{aggregate, TickSummary};
use crate::layer3::alert_state::{ActiveAlert, AlertState, AlertStateMachine};
use crate::layer3::transform::{detect_spike, rolling_average, AlertEvent, SpikeEvent, SpikeParams};
use crate::layer4::hub::BroadcastHub;

// ============================================================================
// Output Types
// ============================================================================

/// Pipeline statistics. Counters never decrease.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStats {
    pub readings_processed: u64,
    pub spikes_detected: u64,
    pub alerts_triggered: u64,
    pub ticks_completed: u64,
    pub entity_failures: u64,
    pub started_at: DateTime<Utc>,
}

impl PipelineStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            readings_processed: 0,
            spikes_detected: 0,
            alerts_triggered: 0,
            ticks_completed: 0,
            entity_failures: 0,
            started_at,
        }
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pipeline(ticks={}, readings={}, spikes={}, alerts={}, failures={})",
            self.ticks_completed,
            self.readings_processed,
            self.spikes_detected,
            self.alerts_triggered,
            self.entity_failures
        )
    }
}

/// Latest reading of one entity plus everything derived from it this tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityResult {
    pub entity_id: String,
    pub entity_name: String,
    pub category: EntityCategory,
    pub reading: Reading,
    pub level: AqiLevel,
    pub rolling_average: f64,
    /// Detected spike or source-reported anomaly
    pub spike: bool,
    pub spike_event: Option<SpikeEvent>,
    pub alert: Option<AlertEvent>,
    pub alert_state: AlertState,
}

impl EntityResult {
    /// Same reading, with this-tick signals cleared. Used when the source fails for a tick.
    fn carried_forward(&self) -> EntityResult {
        EntityResult {
            spike: false,
            spike_event: None,
            alert: None,
            ..self.clone()
        }
    }
}

/// Composite event published once per tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickEvent {
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    pub stats: PipelineStats,
    pub summary: TickSummary,
    pub entities: Vec<EntityResult>,
    pub active_alerts: Vec<ActiveAlert>,
}

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("Entity '{0}' not found")]
    NotFound(String),
    #[error("No data yet for entity '{0}'")]
    NotReady(String),
}

// ============================================================================
// Pipeline View
// ============================================================================

/// Read-only surface over the pipeline's published state.
///
/// The snapshot is replaced whole after each tick, so readers see either the
/// previous tick or the new one, never a mix.
pub struct PipelineView {
    entities: Arc<Vec<Entity>>,
    started_at: DateTime<Utc>,
    snapshot: RwLock<Option<Arc<TickEvent>>>,
    events: RwLock<EventLog>,
    hub: BroadcastHub<Arc<TickEvent>>,
}

impl PipelineView {
    fn new(
        entities: Arc<Vec<Entity>>,
        event_log_capacity: usize,
        hub: BroadcastHub<Arc<TickEvent>>,
    ) -> Self {
        Self {
            entities,
            started_at: Utc::now(),
            snapshot: RwLock::new(None),
            events: RwLock::new(EventLog::new(event_log_capacity)),
            hub,
        }
    }

    /// Latest composite event, `None` before the first tick
    pub fn snapshot(&self) -> Option<Arc<TickEvent>> {
        self.snapshot.read().clone()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    fn known(&self, entity_id: &str) -> Result<&Entity, QueryError> {
        self.entities
            .iter()
            .find(|e| e.id == entity_id)
            .ok_or_else(|| QueryError::NotFound(entity_id.to_string()))
    }

    /// Latest result for one entity
    pub fn entity(&self, entity_id: &str) -> Result<EntityResult, QueryError> {
        self.known(entity_id)?;
        self.snapshot()
            .and_then(|event| {
                event
                    .entities
                    .iter()
                    .find(|r| r.entity_id == entity_id)
                    .cloned()
            })
            .ok_or_else(|| QueryError::NotReady(entity_id.to_string()))
    }

    pub fn active_alerts(&self) -> Vec<ActiveAlert> {
        self.snapshot()
            .map(|event| event.active_alerts.clone())
            .unwrap_or_default()
    }

    /// Recorded alert state of one entity. Entities without a result yet report the `None` tier.
    pub fn entity_alert(&self, entity_id: &str) -> Result<AlertState, QueryError> {
        match self.entity(entity_id) {
            Ok(result) => Ok(result.alert_state),
            Err(QueryError::NotReady(_)) => Ok(AlertState::default()),
            Err(e) => Err(e),
        }
    }

    pub fn stats(&self) -> PipelineStats {
        self.snapshot()
            .map(|event| event.stats.clone())
            .unwrap_or_else(|| PipelineStats::new(self.started_at))
    }

    /// Last `n` log entries, most recent first
    pub fn recent_events(&self, n: usize) -> Vec<LogEntry> {
        self.events.read().recent(n)
    }

    pub fn total_logged(&self) -> u64 {
        self.events.read().total_logged()
    }

    pub fn hub(&self) -> &BroadcastHub<Arc<TickEvent>> {
        &self.hub
    }

    fn log(&self, event_type: &str, level: EventLevel, data: serde_json::Value) {
        self.events.write().append(event_type, level, data);
    }

    fn publish_snapshot(&self, event: Arc<TickEvent>) {
        *self.snapshot.write() = Some(event);
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Single writer of history, alert state and stats
pub struct Pipeline {
    config: PipelineConfig,
    spike_params: SpikeParams,
    entities: Arc<Vec<Entity>>,
    source: Box<dyn ReadingSource>,
    history: HistoryStore,
    alerts: AlertStateMachine,
    stats: PipelineStats,
    latest: HashMap<String, EntityResult>,
    next_tick: u64,
    view: Arc<PipelineView>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        entities: Vec<Entity>,
        source: Box<dyn ReadingSource>,
        hub: BroadcastHub<Arc<TickEvent>>,
    ) -> Self {
        info!(
            entities = entities.len(),
            window_size = config.window_size,
            tick_interval_ms = config.tick_interval_ms,
            "Creating pipeline"
        );

        let entities = Arc::new(entities);
        let view = Arc::new(PipelineView::new(
            Arc::clone(&entities),
            config.event_log_capacity,
            hub,
        ));

        Self {
            spike_params: SpikeParams::from(&config),
            history: HistoryStore::new(config.window_size),
            alerts: AlertStateMachine::new(config.alert_thresholds.clone()),
            stats: PipelineStats::new(view.started_at),
            latest: HashMap::new(),
            next_tick: 0,
            config,
            entities,
            source,
            view,
        }
    }

    pub fn view(&self) -> Arc<PipelineView> {
        Arc::clone(&self.view)
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Run one full tick and publish its composite event
    pub fn run_tick(&mut self) -> Arc<TickEvent> {
        let tick = self.next_tick;
        self.next_tick += 1;

        let entities = Arc::clone(&self.entities);
        let mut results = Vec::with_capacity(entities.len());
        let mut values = Vec::with_capacity(entities.len());

        for entity in entities.iter() {
            match self.process_entity(entity, tick) {
                Ok(result) => {
                    values.push(result.reading.value);
                    self.latest.insert(entity.id.clone(), result.clone());
                    results.push(result);
                }
                Err(e) => {
                    self.stats.entity_failures += 1;
                    warn!(entity = %entity.id, tick = tick, error = %e, "Source failed, keeping last result");
                    // Entities that never produced a reading stay absent
                    if let Some(previous) = self.latest.get(&entity.id) {
                        results.push(previous.carried_forward());
                    }
                }
            }
        }

        let summary = aggregate(&values, entities.len(), self.config.critical_threshold);
        self.stats.ticks_completed += 1;

        let event = Arc::new(TickEvent {
            tick,
            timestamp: Utc::now(),
            stats: self.stats.clone(),
            summary,
            entities: results,
            active_alerts: self.alerts.active(&entities),
        });

        self.view.log(
            PIPELINE_TICK,
            EventLevel::Info,
            json!({
                "tick": tick,
                "average": event.summary.average,
                "maximum": event.summary.maximum,
                "critical_count": event.summary.critical_count,
            }),
        );
        self.view.publish_snapshot(Arc::clone(&event));
        let delivered = self.view.hub.publish(Arc::clone(&event));

        info!(
            tick = tick,
            average = event.summary.average,
            maximum = event.summary.maximum,
            critical = event.summary.critical_count,
            subscribers = delivered,
            "Tick complete"
        );
        event
    }

    /// Read from the source, turning a panic into `SourceError::Unavailable`
    fn read_source(&mut self, entity: &Entity, tick: u64) -> Result<Reading, SourceError> {
        let source = &mut self.source;
        match panic::catch_unwind(AssertUnwindSafe(|| source.read(entity, tick))) {
            Ok(result) => result,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "source panicked".to_string());
                error!(entity = %entity.id, tick = tick, reason = %reason, "Source panicked");
                Err(SourceError::Unavailable {
                    entity_id: entity.id.clone(),
                    reason,
                })
            }
        }
    }

    fn process_entity(&mut self, entity: &Entity, tick: u64) -> Result<EntityResult, SourceError> {
        let raw = self.read_source(entity, tick)?;
        let reading = raw.clamped(self.config.valid_min, self.config.valid_max);
        if reading.value != raw.value {
            debug!(entity = %entity.id, raw = raw.value, clamped = reading.value, "Clamped out-of-range reading");
        }
        self.stats.readings_processed += 1;

        let prior = self.history.window(&entity.id).values();
        let spike_event = detect_spike(&prior, reading.value, &self.spike_params);

        self.history.record(&entity.id, reading.clone());
        let rolling = round1(rolling_average(&self.history.window(&entity.id).values()));

        let alert = self.alerts.observe(&entity.id, reading.value);
        let alert_state = self.alerts.state(&entity.id).cloned().unwrap_or_default();

        if let Some(spike) = &spike_event {
            self.stats.spikes_detected += 1;
            self.view.log(
                SPIKE_DETECTED,
                EventLevel::Warning,
                json!({
                    "entity_id": entity.id,
                    "entity_name": entity.name,
                    "current_value": spike.current_value,
                    "rolling_avg": spike.rolling_avg,
                    "increase_pct": spike.increase_pct,
                }),
            );
            warn!(entity = %entity.id, value = reading.value, increase_pct = spike.increase_pct, "Spike detected");
        }

        if let Some(fired) = &alert {
            self.stats.alerts_triggered += 1;
            self.view.log(
                THRESHOLD_ALERT,
                EventLevel::Critical,
                json!({
                    "entity_id": entity.id,
                    "entity_name": entity.name,
                    "severity": fired.severity,
                    "threshold": fired.threshold,
                    "value": fired.value,
                    "previous_value": fired.previous_value,
                }),
            );
            warn!(entity = %entity.id, severity = %fired.severity, value = fired.value, "Threshold alert");
        }

        Ok(EntityResult {
            entity_id: entity.id.clone(),
            entity_name: entity.name.clone(),
            category: entity.category,
            level: reading.level(),
            rolling_average: rolling,
            spike: spike_event.is_some() || reading.anomaly,
            spike_event,
            alert,
            alert_state,
            reading,
        })
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Drive the pipeline on a fixed period. Each tick completes before the next starts.
pub fn spawn_scheduler(mut pipeline: Pipeline, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_ms = period.as_millis() as u64, "Scheduler started");

        loop {
            interval.tick().await;
            pipeline.run_tick();
        }
    })
}
