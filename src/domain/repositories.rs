//! Repository interfaces for product persistence
//!
//! Trait seams so persistence mechanics stay swappable without touching
//! pipeline logic. Transaction boundaries are narrow: the insert path wraps
//! the product row and its task record in one transaction; updates are
//! single-statement.

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::product::{NewProduct, StoredProduct};

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Look up a product by its upstream primary identity.
    async fn find_by_findqc_id(&self, findqc_id: i64) -> Result<Option<StoredProduct>>;

    /// Insert a first-sighting product as Active together with its Pending
    /// task record, atomically. Returns the database id of the new row.
    ///
    /// This is the only operation that creates a `t_tasks_products` row.
    async fn insert_new(&self, product: &NewProduct, task_id: i64) -> Result<i64>;

    /// Refresh the QC fields of a known product in place. Status is left
    /// untouched; no task record, no event.
    async fn refresh_qc(
        &self,
        findqc_id: i64,
        last_qc_time: Option<DateTime<Utc>>,
        qc_count_30days: i64,
        task_id: i64,
    ) -> Result<()>;

    /// Transition a known product to SoftDeleted. The row is kept for
    /// history; later ingestions still refresh its QC fields.
    async fn soft_delete(&self, findqc_id: i64, task_id: i64) -> Result<()>;

    /// Coarse resume hint: the maximum `category_id` among Active products,
    /// returned only if some product in that category was last touched by
    /// `task_id`. Category-granularity, best-effort; callers must treat a
    /// `None` as "start from the configured beginning".
    async fn resume_category_hint(&self, task_id: i64) -> Result<Option<i64>>;
}
