//! In-flight work tracking for drain.
//!
//! # Responsibilities
//! - Count running session loops and outward hub calls
//! - Release the count automatically when the work ends (guard drop)
//! - Let the shutdown path wait until the count reaches zero

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// Source of unique work IDs. Relaxed ordering is enough for uniqueness.
static WORK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of one tracked unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkId(u64);

impl WorkId {
    fn next() -> Self {
        Self(WORK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for WorkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "work-{}", self.0)
    }
}

/// Counts in-flight work; cloning shares the count.
#[derive(Debug, Clone)]
pub struct InFlightTracker {
    count: Arc<watch::Sender<u64>>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            count: Arc::new(tx),
        }
    }

    /// Register a unit of work. The returned guard releases it on drop.
    pub fn track(&self, kind: &'static str) -> InFlightGuard {
        self.count.send_modify(|count| *count += 1);
        let id = WorkId::next();
        tracing::trace!(work_id = %id, kind, "In-flight work started");
        InFlightGuard {
            count: Arc::clone(&self.count),
            id,
            kind,
        }
    }

    /// Current number of in-flight units.
    pub fn active_count(&self) -> u64 {
        *self.count.borrow()
    }

    /// Resolve once no work is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.count.subscribe();
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

impl Default for InFlightTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps one unit of work registered while alive.
#[derive(Debug)]
pub struct InFlightGuard {
    count: Arc<watch::Sender<u64>>,
    id: WorkId,
    kind: &'static str,
}

impl InFlightGuard {
    pub fn id(&self) -> WorkId {
        self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.send_modify(|count| *count = count.saturating_sub(1));
        tracing::trace!(work_id = %self.id, kind = self.kind, "In-flight work finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn work_ids_are_unique() {
        let tracker = InFlightTracker::new();
        let a = tracker.track("test");
        let b = tracker.track("test");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn tracker_counts() {
        let tracker = InFlightTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track("loop");
        assert_eq!(tracker.active_count(), 1);

        let guard2 = tracker.clone().track("call");
        assert_eq!(tracker.active_count(), 2);

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_when_idle() {
        let tracker = InFlightTracker::new();
        tokio::time::timeout(Duration::from_millis(100), tracker.wait_idle())
            .await
            .expect("idle tracker should not block");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_idle_blocks_until_last_guard_drops() {
        let tracker = InFlightTracker::new();
        let guard = tracker.track("loop");

        let released = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            drop(guard);
        });

        let start = tokio::time::Instant::now();
        tracker.wait_idle().await;
        assert!(start.elapsed() >= Duration::from_secs(3));
        released.await.unwrap();
    }
}
