//! Request lifecycle events.
//!
//! Every created request reaches exactly one terminal event: `Completed`,
//! `CancelledByKeeper` (recoverable execution failure) or
//! `CancelledByUser`. Requesters observe outcomes through this log;
//! keepers never need to branch on it.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::BlockNumber;
use crate::ids::{AccountId, RequestId};

/// A lifecycle event for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RequestEvent {
    /// Request accepted into the store.
    Created {
        id: RequestId,
        account: AccountId,
        kind: String,
        block: BlockNumber,
        /// Serialized request parameters.
        data: Value,
    },
    /// Request executed successfully and removed.
    Completed {
        id: RequestId,
        account: AccountId,
        kind: String,
        block: BlockNumber,
        /// Serialized execution output (e.g. minted amounts).
        data: Value,
    },
    /// Request cancelled by the keeper path after a recoverable
    /// execution failure; escrow refunded.
    CancelledByKeeper {
        id: RequestId,
        account: AccountId,
        kind: String,
        block: BlockNumber,
        /// Human-readable failure reason, bounded in size.
        reason: String,
    },
    /// Request cancelled by its requester before execution.
    CancelledByUser {
        id: RequestId,
        account: AccountId,
        kind: String,
        block: BlockNumber,
    },
}

impl RequestEvent {
    /// The request this event is about.
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Created { id, .. }
            | Self::Completed { id, .. }
            | Self::CancelledByKeeper { id, .. }
            | Self::CancelledByUser { id, .. } => *id,
        }
    }

    /// True for the three terminal variants.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Created { .. })
    }
}

/// Append-only event sink.
pub trait EventLog: Send + Sync {
    fn emit(&self, event: RequestEvent);
}

/// In-memory event log for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<RequestEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all emitted events, in emission order.
    pub fn events(&self) -> Vec<RequestEvent> {
        self.events.lock().clone()
    }

    /// Terminal events emitted for the given request id.
    pub fn terminal_events_for(&self, id: RequestId) -> Vec<RequestEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.request_id() == id && e.is_terminal())
            .cloned()
            .collect()
    }
}

impl EventLog for InMemoryEventLog {
    fn emit(&self, event: RequestEvent) {
        self.events.lock().push(event);
    }
}
