//! Category page-walk state machine
//!
//! Walks one category's listing pages in strict order, feeding every item
//! to the ingestion pipeline. Termination is driven by item count versus
//! page size; the upstream `hasMore` flag is advisory and only trusted for
//! the page-1-empty short circuit.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::application::context::RunContext;
use crate::application::pipeline::IngestionPipeline;
use crate::domain::services::ProductApi;

pub struct CategoryTraversal {
    api: Arc<dyn ProductApi>,
    pipeline: Arc<IngestionPipeline>,
    page_size: u32,
    request_delay: Duration,
}

impl CategoryTraversal {
    pub fn new(
        api: Arc<dyn ProductApi>,
        pipeline: Arc<IngestionPipeline>,
        page_size: u32,
        request_delay: Duration,
    ) -> Self {
        Self { api, pipeline, page_size, request_delay }
    }

    /// Crawl every page of one category. Returns the number of items
    /// processed. Per-item failures are logged and skipped; a listing-page
    /// fetch failure ends the category.
    pub async fn crawl_category(&self, category_id: i64, ctx: &RunContext) -> Result<u64> {
        info!(category_id, "starting category");
        let mut page = 1u32;
        let mut processed = 0u64;

        loop {
            if ctx.should_stop() {
                break;
            }

            let listing = match self.api.fetch_category_page(category_id, page, self.page_size).await {
                Ok(listing) => listing,
                Err(err) => {
                    error!(category_id, page, error = %err, "listing fetch failed, ending category");
                    break;
                }
            };

            // Page-1-empty short circuit: the category has no products.
            if page == 1 && !listing.has_more && listing.items.is_empty() {
                info!(category_id, "category is empty, skipping");
                return Ok(0);
            }

            if listing.items.is_empty() {
                info!(category_id, page, "no items on page, ending category");
                break;
            }

            // A short page is the last page, whatever hasMore says.
            let is_last_page = (listing.items.len() as u32) < self.page_size;

            for item in &listing.items {
                if ctx.should_stop() {
                    info!(category_id, processed, "stop requested mid-page");
                    return Ok(processed);
                }

                match self.pipeline.ingest(item, category_id, ctx.task_id()).await {
                    Ok(_outcome) => {
                        processed += 1;
                        let total = ctx.record_processed();
                        info!(category_id, page, total, "item processed");
                    }
                    Err(err) => {
                        warn!(category_id, page, error = %err, "item failed, continuing with next");
                    }
                }
                tokio::time::sleep(self.request_delay).await;
            }

            if is_last_page {
                info!(category_id, processed, "category finished");
                break;
            }

            page += 1;
            tokio::time::sleep(self.request_delay).await;
        }

        Ok(processed)
    }
}
