// History Store - Per-entity bounded window of recent readings
// Count-based FIFO: pushing past capacity evicts the oldest entry first

use std::collections::{HashMap, VecDeque};

use crate::core::types::Reading;

/// Bounded ordered window of readings, oldest first
#[derive(Debug, Clone)]
pub struct ReadingWindow {
    max_capacity: usize,
    data: VecDeque<Reading>,
}

impl ReadingWindow {
    pub fn new(max_capacity: usize) -> Self {
        let max_capacity = max_capacity.max(1);
        Self {
            max_capacity,
            data: VecDeque::with_capacity(max_capacity),
        }
    }

    /// Append the newest reading, evicting the oldest when full
    pub fn push(&mut self, reading: Reading) {
        if self.data.len() >= self.max_capacity {
            self.data.pop_front();
        }
        self.data.push_back(reading);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.data.iter()
    }

    /// Primary values, oldest first
    pub fn values(&self) -> Vec<i32> {
        self.data.iter().map(|r| r.value).collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_capacity
    }

    pub fn last(&self) -> Option<&Reading> {
        self.data.back()
    }

    pub fn first(&self) -> Option<&Reading> {
        self.data.front()
    }
}

/// One window per entity, created on first access
pub struct HistoryStore {
    window_size: usize,
    windows: HashMap<String, ReadingWindow>,
}

impl HistoryStore {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            windows: HashMap::new(),
        }
    }

    /// Record a reading. Tick order is not checked; ordering belongs to the scheduler.
    pub fn record(&mut self, entity_id: &str, reading: Reading) {
        self.window_mut(entity_id).push(reading);
    }

    /// Window for an entity, most recent last. Unseen entities get an empty window.
    pub fn window(&mut self, entity_id: &str) -> &ReadingWindow {
        self.window_mut(entity_id)
    }

    fn window_mut(&mut self, entity_id: &str) -> &mut ReadingWindow {
        let size = self.window_size;
        self.windows
            .entry(entity_id.to_string())
            .or_insert_with(|| ReadingWindow::new(size))
    }

    pub fn entity_count(&self) -> usize {
        self.windows.len()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }
}
