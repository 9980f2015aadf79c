// Delivery Stream - Per-connection message sequence with idle heartbeats
// Snapshot first, then one update per tick; ends once the subscriber is evicted

use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::layer2::pipeline::{PipelineView, TickEvent};
use crate::layer4::hub::Subscription;

/// Message written to a streaming client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamMessage {
    Snapshot(Arc<TickEvent>),
    AqiUpdate(Arc<TickEvent>),
    Heartbeat { timestamp: DateTime<Utc> },
}

impl StreamMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamMessage::Snapshot(_) => "snapshot",
            StreamMessage::AqiUpdate(_) => "aqi_update",
            StreamMessage::Heartbeat { .. } => "heartbeat",
        }
    }
}

struct DeliveryState {
    subscription: Subscription<Arc<TickEvent>>,
    pending_snapshot: Option<Arc<TickEvent>>,
    /// Tick already covered by the snapshot; earlier or equal updates are dropped
    delivered_through: Option<u64>,
    heartbeat: Duration,
}

/// Subscribe to the hub and turn the mailbox into a message stream.
///
/// Dropping the stream drops the subscription, which unsubscribes it.
pub fn subscriber_stream(
    view: &PipelineView,
    heartbeat: Duration,
) -> impl Stream<Item = StreamMessage> + Send + 'static {
    // Subscribe before reading the snapshot so no tick falls between the two
    let subscription = view.hub().subscribe();
    delivery_stream(subscription, view.snapshot(), heartbeat)
}

fn delivery_stream(
    subscription: Subscription<Arc<TickEvent>>,
    snapshot: Option<Arc<TickEvent>>,
    heartbeat: Duration,
) -> impl Stream<Item = StreamMessage> + Send + 'static {
    let state = DeliveryState {
        subscription,
        delivered_through: snapshot.as_ref().map(|event| event.tick),
        pending_snapshot: snapshot,
        heartbeat,
    };

    stream::unfold(state, |mut state| async move {
        if let Some(snapshot) = state.pending_snapshot.take() {
            return Some((StreamMessage::Snapshot(snapshot), state));
        }

        loop {
            let next = timeout(state.heartbeat, state.subscription.recv()).await;
            match next {
                Ok(Some(event)) if state.delivered_through.is_some_and(|t| event.tick <= t) => {
                    debug!(subscriber = %state.subscription.id(), tick = event.tick, "Skipping tick already sent as snapshot");
                }
                Ok(Some(event)) => return Some((StreamMessage::AqiUpdate(event), state)),
                Ok(None) => {
                    debug!(subscriber = %state.subscription.id(), "Mailbox closed, ending stream");
                    return None;
                }
                Err(_) => return Some((StreamMessage::Heartbeat { timestamp: Utc::now() }, state)),
            }
        }
    })
}
