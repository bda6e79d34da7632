//! Run-scoped shared state
//!
//! One `RunContext` per crawl run, owned by the coordinator and passed down
//! the call chain. Replaces the module-level counters the legacy scripts
//! used: the batch id, the global item counter with its optional cap, and
//! the cancellation token all live here.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

pub struct RunContext {
    /// Batch identifier stamped on every row this run touches.
    task_id: i64,
    /// Items successfully processed so far, across all categories.
    processed: AtomicU64,
    /// Optional global cap for bounded test/partial runs.
    max_products: Option<u64>,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(task_id: i64, max_products: Option<u64>, cancel: CancellationToken) -> Self {
        Self { task_id, processed: AtomicU64::new(0), max_products, cancel }
    }

    pub fn task_id(&self) -> i64 {
        self.task_id
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    /// Best-effort cap check; not preemptive. Workers consult this before
    /// scheduling the next item or page.
    pub fn limit_reached(&self) -> bool {
        match self.max_products {
            Some(max) => self.processed.load(Ordering::SeqCst) >= max,
            None => false,
        }
    }

    pub fn record_processed(&self) -> u64 {
        self.processed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True once the run should stop scheduling new work, either because it
    /// was cancelled or because the item cap was hit.
    pub fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.limit_reached()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_is_enforced_after_enough_items() {
        let ctx = RunContext::new(1, Some(2), CancellationToken::new());
        assert!(!ctx.limit_reached());
        ctx.record_processed();
        assert!(!ctx.limit_reached());
        ctx.record_processed();
        assert!(ctx.limit_reached());
        assert!(ctx.should_stop());
    }

    #[test]
    fn uncapped_run_never_hits_the_limit() {
        let ctx = RunContext::new(1, None, CancellationToken::new());
        for _ in 0..1000 {
            ctx.record_processed();
        }
        assert!(!ctx.limit_reached());
    }

    #[test]
    fn cancellation_stops_scheduling() {
        let token = CancellationToken::new();
        let ctx = RunContext::new(1, None, token.clone());
        assert!(!ctx.should_stop());
        token.cancel();
        assert!(ctx.should_stop());
    }
}
