//! Bounded fan-out of category traversals
//!
//! Runs one traversal task per category id under a semaphore, isolating
//! category failures from siblings. Within a category pages stay strictly
//! sequential; across categories completion order is arbitrary and only
//! used for bookkeeping.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::application::context::RunContext;
use crate::application::traversal::CategoryTraversal;

/// Bookkeeping for one crawl run.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrawlSummary {
    pub categories_completed: u64,
    pub categories_failed: u64,
    pub items_processed: u64,
}

pub struct ConcurrencyCoordinator {
    traversal: Arc<CategoryTraversal>,
    max_concurrent_categories: usize,
}

impl ConcurrencyCoordinator {
    pub fn new(traversal: Arc<CategoryTraversal>, max_concurrent_categories: usize) -> Self {
        Self { traversal, max_concurrent_categories: max_concurrent_categories.max(1) }
    }

    /// Crawl every category id in `categories`. A failed category is logged
    /// and counted; it never cancels its siblings.
    pub async fn run(&self, categories: Vec<i64>, ctx: Arc<RunContext>) -> Result<CrawlSummary> {
        info!(
            categories = categories.len(),
            concurrency = self.max_concurrent_categories,
            task_id = ctx.task_id(),
            "starting crawl run"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_categories));
        let mut join_set: JoinSet<(i64, Result<u64>)> = JoinSet::new();

        for category_id in categories {
            let semaphore = Arc::clone(&semaphore);
            let traversal = Arc::clone(&self.traversal);
            let ctx = Arc::clone(&ctx);

            join_set.spawn(async move {
                // Closed semaphore cannot happen; it lives as long as the run.
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                if ctx.should_stop() {
                    return (category_id, Ok(0));
                }
                let result = traversal.crawl_category(category_id, &ctx).await;
                (category_id, result)
            });
        }

        let mut summary = CrawlSummary::default();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((category_id, Ok(count))) => {
                    summary.categories_completed += 1;
                    summary.items_processed += count;
                    info!(category_id, items = count, "category traversal complete");
                }
                Ok((category_id, Err(err))) => {
                    summary.categories_failed += 1;
                    error!(category_id, error = %err, "category traversal failed");
                }
                Err(err) => {
                    summary.categories_failed += 1;
                    error!(error = %err, "category task panicked");
                }
            }
        }

        info!(
            completed = summary.categories_completed,
            failed = summary.categories_failed,
            items = summary.items_processed,
            "crawl run finished"
        );
        Ok(summary)
    }
}
