//! Core product entities for the FindQC catalog
//!
//! One `Product` row per upstream item, keyed by the immutable `findqc_id`.
//! Rows are never hard-deleted; stale products transition to `SoftDeleted`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row status for `t_products`. Stored as INTEGER 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductStatus {
    Active,
    SoftDeleted,
}

impl ProductStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            ProductStatus::Active => 0,
            ProductStatus::SoftDeleted => 1,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        if value == 0 {
            ProductStatus::Active
        } else {
            ProductStatus::SoftDeleted
        }
    }
}

/// Status for `t_tasks_products` work records. Stored as INTEGER 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Done,
}

impl TaskStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Done => 1,
        }
    }
}

/// Image URL bundle persisted as one JSON column.
///
/// Order-preserving; the QC list is de-duplicated by URL at normalization
/// time, first sighting wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrls {
    #[serde(default)]
    pub qc_images: Vec<String>,
    #[serde(default)]
    pub main_images: Vec<String>,
    #[serde(default)]
    pub sku_images: Vec<String>,
}

/// A normalized product ready for persistence, produced by the ingestion
/// pipeline after the freshness gate has passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub findqc_id: i64,
    #[serde(rename = "itemId")]
    pub item_id: String,
    #[serde(rename = "mallType")]
    pub mall_type: String,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i64>,
    /// Raw upstream price string; locale/formatting quirks preserved.
    pub price: Option<String>,
    pub weight: Option<f64>,
    pub image_urls: ImageUrls,
    pub last_qc_time: Option<DateTime<Utc>>,
    pub qc_count_30days: i64,
}

/// A product row as stored in `t_products`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProduct {
    pub id: i64,
    pub findqc_id: i64,
    #[serde(rename = "itemId")]
    pub item_id: String,
    #[serde(rename = "mallType")]
    pub mall_type: String,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i64>,
    pub price: Option<String>,
    pub weight: Option<f64>,
    pub image_urls: ImageUrls,
    pub last_qc_time: Option<DateTime<Utc>>,
    pub qc_count_30days: i64,
    pub status: ProductStatus,
    pub update_task_id: i64,
    pub last_update: Option<DateTime<Utc>>,
}

/// Outcome of applying the lifecycle policy to one eligible product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// First sighting: row inserted, task record created, event published.
    Created,
    /// Known product with fresh QC data: QC fields updated in place.
    Refreshed,
    /// Known product whose QC data went stale or missing.
    SoftDeleted,
    /// Freshness gate rejected the product; nothing written.
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_storage_repr() {
        assert_eq!(ProductStatus::from_i64(ProductStatus::Active.as_i64()), ProductStatus::Active);
        assert_eq!(
            ProductStatus::from_i64(ProductStatus::SoftDeleted.as_i64()),
            ProductStatus::SoftDeleted
        );
        // Unknown values collapse to SoftDeleted rather than panicking.
        assert_eq!(ProductStatus::from_i64(7), ProductStatus::SoftDeleted);
    }

    #[test]
    fn image_urls_serialize_as_stable_json_keys() {
        let urls = ImageUrls {
            qc_images: vec!["https://img/qc1.jpg".into()],
            main_images: vec!["https://img/main.jpg".into()],
            sku_images: vec![],
        };
        let json = serde_json::to_value(&urls).unwrap();
        assert!(json.get("qc_images").is_some());
        assert!(json.get("main_images").is_some());
        assert!(json.get("sku_images").is_some());
    }
}
