//! The pending-request store.
//!
//! Keyed by store-issued monotonic ids. Requests enter through `insert`
//! at creation and leave through `remove` on every terminal transition.
//! Ids are never reused, so a removed request's id stays dead forever
//! and repeated execution or cancellation of it reports `NotFound`.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use lpx_core::{Request, RequestId};

/// Concurrent map of pending requests.
#[derive(Debug, Default)]
pub struct RequestStore {
    requests: RwLock<HashMap<RequestId, Request>>,
    next_id: AtomicU64,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next request id. Strictly increasing, starting at 1.
    pub fn next_id(&self) -> RequestId {
        RequestId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn insert(&self, request: Request) {
        self.requests.write().insert(request.id, request);
    }

    pub fn get(&self, id: &RequestId) -> Option<Request> {
        self.requests.read().get(id).cloned()
    }

    pub fn remove(&self, id: &RequestId) -> Option<Request> {
        self.requests.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.requests.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.read().is_empty()
    }
}
