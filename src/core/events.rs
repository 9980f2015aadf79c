// Event Log for Air Watch
// Bounded ring buffer of notable pipeline occurrences, newest evicting oldest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ============================================================================
// Event Types
// ============================================================================

pub const SPIKE_DETECTED: &str = "SPIKE_DETECTED";
pub const THRESHOLD_ALERT: &str = "THRESHOLD_ALERT";
pub const PIPELINE_TICK: &str = "PIPELINE_TICK";

// ============================================================================
// Event Level
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Critical = 1, // Threshold alerts
    Warning = 2,  // Spikes
    Info = 3,     // Tick summaries
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// Log Entry
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: u64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub level: EventLevel,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogEntry(id={}, type={}, level={})",
            self.id, self.event_type, self.level
        )
    }
}

// ============================================================================
// Event Log
// ============================================================================

pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_id: u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(10_000)),
            capacity: capacity.max(1),
            next_id: 1,
        }
    }

    /// Append an entry, evicting the oldest once at capacity. Returns the assigned id.
    pub fn append(&mut self, event_type: &str, level: EventLevel, data: serde_json::Value) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            id,
            event_type: event_type.to_string(),
            level,
            data,
            timestamp: Utc::now(),
        });
        id
    }

    /// Last `n` entries, most recent first
    pub fn recent(&self, n: usize) -> Vec<LogEntry> {
        self.entries.iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries ever appended, including evicted ones
    pub fn total_logged(&self) -> u64 {
        self.next_id - 1
    }
}
