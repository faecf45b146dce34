use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::storage::TupleRow;
use crate::tuple::TupleSelector;

/// Opaque identity of one subscription channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelHandle(Uuid);

impl ChannelHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One delivery to a subscriber: the selector it subscribed with and the
/// freshly produced tuples for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuplePush {
    pub selector: TupleSelector,
    pub tuples: Vec<TupleRow>,
}

/// Receiving end handed to the subscriber (or the transport acting for it).
pub type TupleReceiver = mpsc::Receiver<TuplePush>;

/// Registry-side bookkeeping for one live subscription.
///
/// The sender is bounded: a subscriber that stops draining loses deliveries
/// instead of stalling the mutation that triggered them.
pub(crate) struct SubscriptionChannel {
    pub handle: ChannelHandle,
    pub selector: TupleSelector,
    pub sender: mpsc::Sender<TuplePush>,
    pub pushes_sent: Arc<AtomicU64>,
}

impl SubscriptionChannel {
    pub fn new(selector: TupleSelector, capacity: usize) -> (Self, TupleReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let channel = Self {
            handle: ChannelHandle::new(),
            selector,
            sender,
            pushes_sent: Arc::new(AtomicU64::new(0)),
        };
        (channel, receiver)
    }
}
