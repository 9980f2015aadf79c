// Layer 4 - Delivery
// Subscriber fan-out, per-connection streams and the HTTP surface

pub mod hub;
pub mod delivery;
pub mod api;

pub use hub::{BroadcastHub, HubStats, Subscription};
pub use delivery::{subscriber_stream, StreamMessage};
pub use api::{create_router, serve, ApiError, ApiState};
