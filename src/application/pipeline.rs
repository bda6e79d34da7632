//! Per-product ingestion pipeline
//!
//! For one listing item: fetch detail and all atlas pages, normalize the
//! image/timestamp data, apply the freshness gate, and run the lifecycle
//! policy against storage. A failure here is the item's alone; callers log
//! it and move on to the next item.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{info, warn};

use crate::domain::events::NewProductMessage;
use crate::domain::product::{ImageUrls, LifecycleOutcome, NewProduct};
use crate::domain::repositories::ProductRepository;
use crate::domain::services::{EventPublisher, ProductApi};
use crate::infrastructure::api_types::{AtlasPage, GoodsDetail, ListingItem};

/// Trailing window that decides whether QC data is current.
pub const FRESHNESS_WINDOW_DAYS: i64 = 30;

/// Epoch values above this are milliseconds. Fragile for dates far in the
/// past or future; kept as-is from the source behavior.
const MILLIS_THRESHOLD: i64 = 10_000_000_000;

/// Normalize an upstream epoch value to seconds.
pub fn normalize_epoch(raw: i64) -> i64 {
    if raw > MILLIS_THRESHOLD {
        raw / 1000
    } else {
        raw
    }
}

/// Image bundle plus QC recency figures for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQc {
    pub image_urls: ImageUrls,
    pub last_qc_time: Option<DateTime<Utc>>,
    pub qc_count_30days: i64,
}

/// Merge detail and atlas payloads into the persisted shape.
///
/// QC URLs keep first-seen order (detail first, then atlas pages in fetch
/// order) and are de-duplicated; QC timestamps are collected from both
/// sources before the max/window computations.
pub fn normalize_qc_data(
    detail: &GoodsDetail,
    atlas_pages: &[AtlasPage],
    now: DateTime<Utc>,
) -> NormalizedQc {
    let mut qc_images: Vec<String> = Vec::new();
    let mut qc_times: Vec<i64> = Vec::new();

    let mut push_qc = |url: &Option<String>, time: &Option<i64>, images: &mut Vec<String>| {
        if let Some(url) = url {
            if !images.iter().any(|u| u == url) {
                images.push(url.clone());
            }
        }
        if let Some(raw) = time {
            qc_times.push(normalize_epoch(*raw));
        }
    };

    for qc in &detail.qc_list {
        push_qc(&qc.url, &qc.time, &mut qc_images);
    }
    for page in atlas_pages {
        for item in &page.atlas_items {
            for qc in &item.qc_list {
                push_qc(&qc.url, &qc.time, &mut qc_images);
            }
        }
    }

    let sku_images: Vec<String> = detail
        .props_list
        .iter()
        .flat_map(|prop| prop.option_list.iter())
        .filter_map(|option| option.pic_url.clone())
        .collect();

    let last_qc_time = qc_times
        .iter()
        .max()
        .and_then(|secs| DateTime::from_timestamp(*secs, 0));

    let window = ChronoDuration::days(FRESHNESS_WINDOW_DAYS);
    let qc_count_30days = qc_times
        .iter()
        .filter_map(|secs| DateTime::from_timestamp(*secs, 0))
        .filter(|t| now.signed_duration_since(*t) <= window)
        .count() as i64;

    NormalizedQc {
        image_urls: ImageUrls {
            qc_images,
            main_images: detail.pic_list.clone(),
            sku_images,
        },
        last_qc_time,
        qc_count_30days,
    }
}

/// Eligibility for persistence: some QC image exists and the newest QC
/// timestamp falls inside the freshness window.
pub fn passes_freshness_gate(normalized: &NormalizedQc, now: DateTime<Utc>) -> bool {
    if normalized.image_urls.qc_images.is_empty() {
        return false;
    }
    is_within_window(normalized.last_qc_time, now)
}

fn is_within_window(time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match time {
        Some(t) => now.signed_duration_since(t) <= ChronoDuration::days(FRESHNESS_WINDOW_DAYS),
        None => false,
    }
}

pub struct IngestionPipeline {
    api: Arc<dyn ProductApi>,
    repository: Arc<dyn ProductRepository>,
    publisher: Arc<dyn EventPublisher>,
    atlas_page_size: u32,
    request_delay: Duration,
}

impl IngestionPipeline {
    pub fn new(
        api: Arc<dyn ProductApi>,
        repository: Arc<dyn ProductRepository>,
        publisher: Arc<dyn EventPublisher>,
        atlas_page_size: u32,
        request_delay: Duration,
    ) -> Self {
        Self { api, repository, publisher, atlas_page_size, request_delay }
    }

    /// Ingest one listing item end to end.
    pub async fn ingest(
        &self,
        item: &ListingItem,
        category_id: i64,
        task_id: i64,
    ) -> Result<LifecycleOutcome> {
        let (Some(findqc_id), Some(item_id), Some(mall_type)) =
            (item.id, item.item_id.as_deref(), item.mall_type.as_deref())
        else {
            warn!(category_id, "listing item missing identity fields, skipping");
            return Ok(LifecycleOutcome::Skipped);
        };

        let detail = self
            .api
            .fetch_product_detail(item_id, mall_type)
            .await
            .with_context(|| format!("detail fetch failed for findqc_id={findqc_id}"))?;

        let atlas_pages = self.fetch_all_atlas_pages(findqc_id, item_id, mall_type).await;

        let now = Utc::now();
        let normalized = normalize_qc_data(&detail, &atlas_pages, now);

        let product = NewProduct {
            findqc_id,
            item_id: item_id.to_string(),
            mall_type: mall_type.to_string(),
            category_id: Some(category_id),
            price: detail.price.clone(),
            weight: detail.weight,
            image_urls: normalized.image_urls.clone(),
            last_qc_time: normalized.last_qc_time,
            qc_count_30days: normalized.qc_count_30days,
        };

        self.apply_lifecycle(&product, &normalized, task_id, now).await
    }

    /// Walk atlas pages sequentially from page 1. Stops on an empty page or
    /// `hasMore == false`. A fetch failure ends accumulation without failing
    /// the product; the detail's own QC list still stands.
    async fn fetch_all_atlas_pages(
        &self,
        findqc_id: i64,
        item_id: &str,
        mall_type: &str,
    ) -> Vec<AtlasPage> {
        let goods_id = findqc_id.to_string();
        let mut pages = Vec::new();
        let mut page_no = 1u32;

        loop {
            let page = match self
                .api
                .fetch_product_atlas(&goods_id, item_id, mall_type, page_no, self.atlas_page_size)
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    warn!(findqc_id, page = page_no, error = %err, "atlas fetch failed, stopping atlas walk");
                    break;
                }
            };

            if page.atlas_items.is_empty() {
                break;
            }
            let has_more = page.has_more;
            pages.push(page);
            if !has_more {
                break;
            }
            page_no += 1;
            tokio::time::sleep(self.request_delay).await;
        }

        pages
    }

    /// The upsert/lifecycle policy.
    ///
    /// Unknown products pass the freshness gate or are skipped without a
    /// write. Known products always get a lifecycle decision: stale or
    /// missing QC data transitions them to SoftDeleted, fresh data refreshes
    /// the QC fields in place. Only the creation path emits an event.
    async fn apply_lifecycle(
        &self,
        product: &NewProduct,
        normalized: &NormalizedQc,
        task_id: i64,
        now: DateTime<Utc>,
    ) -> Result<LifecycleOutcome> {
        let existing = self.repository.find_by_findqc_id(product.findqc_id).await?;

        let Some(_existing) = existing else {
            if !passes_freshness_gate(normalized, now) {
                info!(findqc_id = product.findqc_id, "no fresh QC data, skipping persistence");
                return Ok(LifecycleOutcome::Skipped);
            }

            let product_id = self.repository.insert_new(product, task_id).await?;
            info!(findqc_id = product.findqc_id, product_id, "new product saved");

            // Publish after commit. A lost announcement is accepted here;
            // there is no outbox or reconciliation.
            let message = NewProductMessage::new(
                task_id,
                product.findqc_id,
                product_id,
                product.item_id.clone(),
                product.mall_type.clone(),
            );
            if let Err(err) = self.publisher.publish_new_product(&message).await {
                warn!(findqc_id = product.findqc_id, error = %err, "product.new publish failed");
            }
            return Ok(LifecycleOutcome::Created);
        };

        if product.last_qc_time.is_none() {
            self.repository.soft_delete(product.findqc_id, task_id).await?;
            info!(findqc_id = product.findqc_id, "QC time missing, soft-deleted");
            return Ok(LifecycleOutcome::SoftDeleted);
        }

        if is_within_window(product.last_qc_time, now) {
            self.repository
                .refresh_qc(product.findqc_id, product.last_qc_time, product.qc_count_30days, task_id)
                .await?;
            info!(findqc_id = product.findqc_id, "QC fields refreshed");
            Ok(LifecycleOutcome::Refreshed)
        } else {
            self.repository.soft_delete(product.findqc_id, task_id).await?;
            info!(findqc_id = product.findqc_id, "QC data stale, soft-deleted");
            Ok(LifecycleOutcome::SoftDeleted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::api_types::{AtlasItem, QcEntry};
    use chrono::TimeZone;

    fn qc(url: &str, time: i64) -> QcEntry {
        QcEntry { url: Some(url.to_string()), time: Some(time) }
    }

    #[test]
    fn millisecond_and_second_inputs_normalize_to_the_same_instant() {
        assert_eq!(normalize_epoch(1_700_000_000_000), normalize_epoch(1_700_000_000));
        assert_eq!(normalize_epoch(1_700_000_000), 1_700_000_000);
    }

    #[test]
    fn qc_urls_are_deduplicated_in_first_seen_order() {
        let detail = GoodsDetail {
            qc_list: vec![qc("https://img/a.jpg", 1_700_000_000), qc("https://img/b.jpg", 1_700_000_100)],
            ..Default::default()
        };
        let atlas = vec![AtlasPage {
            atlas_items: vec![AtlasItem {
                qc_list: vec![qc("https://img/b.jpg", 1_700_000_100), qc("https://img/c.jpg", 1_700_000_200)],
            }],
            has_more: false,
        }];
        let now = Utc.timestamp_opt(1_700_000_300, 0).unwrap();
        let normalized = normalize_qc_data(&detail, &atlas, now);
        assert_eq!(
            normalized.image_urls.qc_images,
            vec!["https://img/a.jpg", "https://img/b.jpg", "https://img/c.jpg"]
        );
    }

    #[test]
    fn last_qc_time_is_the_max_across_detail_and_atlas() {
        let detail = GoodsDetail {
            qc_list: vec![qc("https://img/a.jpg", 1_700_000_000)],
            ..Default::default()
        };
        // Atlas carries the newest timestamp, in milliseconds.
        let atlas = vec![AtlasPage {
            atlas_items: vec![AtlasItem { qc_list: vec![qc("https://img/b.jpg", 1_700_100_000_000)] }],
            has_more: false,
        }];
        let now = Utc.timestamp_opt(1_700_200_000, 0).unwrap();
        let normalized = normalize_qc_data(&detail, &atlas, now);
        assert_eq!(
            normalized.last_qc_time,
            Some(Utc.timestamp_opt(1_700_100_000, 0).unwrap())
        );
    }

    #[test]
    fn window_count_only_includes_recent_timestamps() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let recent = now.timestamp() - 86_400; // 1 day old
        let old = now.timestamp() - 40 * 86_400; // 40 days old
        let detail = GoodsDetail {
            qc_list: vec![qc("https://img/a.jpg", recent), qc("https://img/b.jpg", old)],
            ..Default::default()
        };
        let normalized = normalize_qc_data(&detail, &[], now);
        assert_eq!(normalized.qc_count_30days, 1);
    }

    #[test]
    fn gate_rejects_empty_qc_list_regardless_of_other_fields() {
        let now = Utc::now();
        let normalized = NormalizedQc {
            image_urls: ImageUrls {
                qc_images: vec![],
                main_images: vec!["https://img/main.jpg".into()],
                sku_images: vec!["https://img/sku.jpg".into()],
            },
            last_qc_time: Some(now),
            qc_count_30days: 5,
        };
        assert!(!passes_freshness_gate(&normalized, now));
    }

    #[test]
    fn gate_rejects_stale_and_missing_qc_time() {
        let now = Utc::now();
        let mut normalized = NormalizedQc {
            image_urls: ImageUrls { qc_images: vec!["https://img/qc.jpg".into()], ..Default::default() },
            last_qc_time: None,
            qc_count_30days: 0,
        };
        assert!(!passes_freshness_gate(&normalized, now));

        normalized.last_qc_time = Some(now - ChronoDuration::days(31));
        assert!(!passes_freshness_gate(&normalized, now));

        normalized.last_qc_time = Some(now - ChronoDuration::days(29));
        assert!(passes_freshness_gate(&normalized, now));
    }

    #[test]
    fn sku_images_flatten_the_option_tree() {
        use crate::infrastructure::api_types::{PropEntry, PropOption};
        let detail = GoodsDetail {
            props_list: vec![
                PropEntry {
                    option_list: vec![
                        PropOption { pic_url: Some("https://img/s1.jpg".into()) },
                        PropOption { pic_url: None },
                    ],
                },
                PropEntry {
                    option_list: vec![PropOption { pic_url: Some("https://img/s2.jpg".into()) }],
                },
            ],
            ..Default::default()
        };
        let normalized = normalize_qc_data(&detail, &[], Utc::now());
        assert_eq!(normalized.image_urls.sku_images, vec!["https://img/s1.jpg", "https://img/s2.jpg"]);
    }
}
