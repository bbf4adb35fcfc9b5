//! Atomic router statistics counters.
//!
//! Lock-free counters for request outcomes and per-target forwards.
//! All atomics use `Relaxed` ordering: these are monotonic display counters
//! with no synchronization requirements.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

#[derive(Default)]
struct StatsInner {
    total_requests: AtomicU64,
    rejected_requests: AtomicU64,
    selected_responses: AtomicU64,
    no_response: AtomicU64,
    forwards_succeeded: AtomicU64,
    forwards_failed: AtomicU64,
}

/// Thread-safe atomic router statistics. Cheap to clone (Arc).
#[derive(Clone, Default)]
pub struct RouterStats {
    inner: Arc<StatsInner>,
}

/// Snapshot of current stats values, serializable to JSON.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub rejected_requests: u64,
    pub selected_responses: u64,
    pub no_response: u64,
    pub forwards_succeeded: u64,
    pub forwards_failed: u64,
}

impl RouterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_requests(&self) {
        self.inner.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.inner.rejected_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_selected(&self) {
        self.inner.selected_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_no_response(&self) {
        self.inner.no_response.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_forward_succeeded(&self) {
        self.inner.forwards_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_forward_failed(&self) {
        self.inner.forwards_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.inner.total_requests.load(Ordering::Relaxed),
            rejected_requests: self.inner.rejected_requests.load(Ordering::Relaxed),
            selected_responses: self.inner.selected_responses.load(Ordering::Relaxed),
            no_response: self.inner.no_response.load(Ordering::Relaxed),
            forwards_succeeded: self.inner.forwards_succeeded.load(Ordering::Relaxed),
            forwards_failed: self.inner.forwards_failed.load(Ordering::Relaxed),
        }
    }
}
