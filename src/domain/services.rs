//! Service interfaces at the crawl pipeline's seams
//!
//! `ProductApi` hides the HTTP client (and its retry policy) from the
//! traversal/pipeline layers; `EventPublisher` hides the message bus.

use async_trait::async_trait;
use anyhow::Result;

use crate::domain::events::NewProductMessage;
use crate::infrastructure::api_types::{AtlasPage, CategoryPage, GoodsDetail};
use crate::infrastructure::http_client::ApiError;

/// The three FindQC read calls, already retried and decoded.
#[async_trait]
pub trait ProductApi: Send + Sync {
    async fn fetch_category_page(
        &self,
        catalogue_id: i64,
        page: u32,
        size: u32,
    ) -> Result<CategoryPage, ApiError>;

    async fn fetch_product_detail(
        &self,
        item_id: &str,
        mall_type: &str,
    ) -> Result<GoodsDetail, ApiError>;

    async fn fetch_product_atlas(
        &self,
        goods_id: &str,
        item_id: &str,
        mall_type: &str,
        page: u32,
        size: u32,
    ) -> Result<AtlasPage, ApiError>;
}

/// Publisher for the "new product" announcement.
///
/// Delivery is at-least-once from the broker's perspective; a publish
/// failure after the database commit is logged by callers and never
/// reconciled (accepted inconsistency window, no outbox).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish_new_product(&self, message: &NewProductMessage) -> Result<()>;
}
