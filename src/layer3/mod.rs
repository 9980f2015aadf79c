// Layer 3 - Transforms
// Rolling statistics, alert tiers, tick aggregation and advisory lookup

pub mod transform;
pub mod alert_state;
pub mod aggregator;
pub mod advisory;

pub use transform::{
    check_alert_edge, detect_spike, rolling_average, AlertEvent, SpikeEvent, SpikeParams,
};
pub use alert_state::{ActiveAlert, AlertLadder, AlertState, AlertStateMachine, AlertTier};
pub use aggregator::{aggregate, TickSummary};
pub use advisory::{advisory_for, document_store, AdvisoryContext, DocumentStore, Guideline};
