//! Broadcast hub: one producer, many subscribers

pub mod broadcast;
pub mod subscriber;

pub use broadcast::{Hub, HubStats, PublishReport};
pub use subscriber::{Subscriber, SubscriberId};
