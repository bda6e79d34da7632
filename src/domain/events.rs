//! Downstream event contracts
//!
//! The spider announces each newly discovered product on the `findqc_tasks`
//! topic exchange so the AI-tagging pipeline can pick it up. Updates and
//! soft-deletes are intentionally silent.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Routing key used for creation announcements.
pub const ROUTING_KEY_PRODUCT_NEW: &str = "product.new";

/// Message body published once per newly created product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProductMessage {
    pub task_id: i64,
    pub findqc_id: i64,
    /// Database id of the freshly inserted `t_products` row.
    pub product_id: i64,
    #[serde(rename = "itemId")]
    pub item_id: String,
    #[serde(rename = "mallType")]
    pub mall_type: String,
    pub action: String,
    /// ISO-8601 UTC timestamp of publication.
    pub timestamp: String,
}

impl NewProductMessage {
    pub fn new(
        task_id: i64,
        findqc_id: i64,
        product_id: i64,
        item_id: impl Into<String>,
        mall_type: impl Into<String>,
    ) -> Self {
        Self::with_timestamp(task_id, findqc_id, product_id, item_id, mall_type, Utc::now())
    }

    pub fn with_timestamp(
        task_id: i64,
        findqc_id: i64,
        product_id: i64,
        item_id: impl Into<String>,
        mall_type: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            findqc_id,
            product_id,
            item_id: item_id.into(),
            mall_type: mall_type.into(),
            action: ROUTING_KEY_PRODUCT_NEW.to_string(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}
