//! Subscriber seam between the hub and the transport

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::error::SubscriberError;
use crate::protocol::EncodedPayload;

/// Identity of one subscriber connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One consumer of the published stream.
///
/// The transport owns the underlying connection; the hub only keeps a
/// shared handle and forgets it on reap or unregister.
#[async_trait]
pub trait Subscriber: Send + Sync {
    fn id(&self) -> SubscriberId;

    /// False once the transport has seen the connection close
    fn is_active(&self) -> bool;

    /// Deliver one payload.
    ///
    /// `Closed` means the connection is gone and the subscriber should be
    /// reaped; `Backpressure` means this payload was skipped.
    async fn send(&self, payload: EncodedPayload) -> Result<(), SubscriberError>;
}
