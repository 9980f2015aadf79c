// Layer 2 - History & Scheduling
// Bounded per-entity windows and the single-writer tick loop

pub mod history;
pub mod pipeline;

// Re-export commonly used items
pub use history::{HistoryStore, ReadingWindow};
pub use pipeline::{
    spawn_scheduler, EntityResult, Pipeline, PipelineStats, PipelineView,
    QueryError, TickEvent,
};
