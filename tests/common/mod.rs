//! Shared test doubles: a scriptable upstream API and a capturing publisher.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;

use findqc_spider::domain::events::NewProductMessage;
use findqc_spider::domain::services::{EventPublisher, ProductApi};
use findqc_spider::infrastructure::api_types::{AtlasPage, CategoryPage, GoodsDetail};
use findqc_spider::infrastructure::http_client::ApiError;

/// Scriptable `ProductApi`: listing pages per category, details per item id,
/// atlas pages per goods id, plus failure injection.
#[derive(Default)]
pub struct MockApi {
    /// Pages per category, in page order (index 0 is page 1).
    pub pages: Mutex<HashMap<i64, Vec<CategoryPage>>>,
    pub details: Mutex<HashMap<String, GoodsDetail>>,
    pub atlas: Mutex<HashMap<String, Vec<AtlasPage>>>,
    /// Item ids whose detail fetch fails with a terminal 404.
    pub failing_details: Mutex<HashSet<String>>,
    /// Category ids whose listing fetch fails with a 503.
    pub failing_categories: Mutex<HashSet<i64>>,
    pub list_calls: AtomicU32,
    pub detail_calls: AtomicU32,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pages(&self, category_id: i64, pages: Vec<CategoryPage>) {
        self.pages.lock().unwrap().insert(category_id, pages);
    }

    pub fn set_detail(&self, item_id: &str, detail: GoodsDetail) {
        self.details.lock().unwrap().insert(item_id.to_string(), detail);
    }

    pub fn set_atlas(&self, goods_id: &str, pages: Vec<AtlasPage>) {
        self.atlas.lock().unwrap().insert(goods_id.to_string(), pages);
    }

    pub fn fail_detail(&self, item_id: &str) {
        self.failing_details.lock().unwrap().insert(item_id.to_string());
    }

    pub fn fail_category(&self, category_id: i64) {
        self.failing_categories.lock().unwrap().insert(category_id);
    }
}

#[async_trait]
impl ProductApi for MockApi {
    async fn fetch_category_page(
        &self,
        catalogue_id: i64,
        page: u32,
        _size: u32,
    ) -> Result<CategoryPage, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_categories.lock().unwrap().contains(&catalogue_id) {
            return Err(ApiError::Server { status: StatusCode::SERVICE_UNAVAILABLE });
        }
        let pages = self.pages.lock().unwrap();
        Ok(pages
            .get(&catalogue_id)
            .and_then(|p| p.get((page - 1) as usize))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_product_detail(
        &self,
        item_id: &str,
        _mall_type: &str,
    ) -> Result<GoodsDetail, ApiError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_details.lock().unwrap().contains(item_id) {
            return Err(ApiError::Client { status: StatusCode::NOT_FOUND });
        }
        Ok(self.details.lock().unwrap().get(item_id).cloned().unwrap_or_default())
    }

    async fn fetch_product_atlas(
        &self,
        goods_id: &str,
        _item_id: &str,
        _mall_type: &str,
        page: u32,
        _size: u32,
    ) -> Result<AtlasPage, ApiError> {
        let atlas = self.atlas.lock().unwrap();
        Ok(atlas
            .get(goods_id)
            .and_then(|p| p.get((page - 1) as usize))
            .cloned()
            .unwrap_or_default())
    }
}

/// Publisher that records every message.
#[derive(Default)]
pub struct CapturePublisher {
    pub published: Mutex<Vec<NewProductMessage>>,
}

impl CapturePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl EventPublisher for CapturePublisher {
    async fn publish_new_product(&self, message: &NewProductMessage) -> Result<()> {
        self.published.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Publisher that always fails, for the accepted-inconsistency path.
pub struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish_new_product(&self, _message: &NewProductMessage) -> Result<()> {
        anyhow::bail!("broker gone")
    }
}
