//! FindQC HTTP client with retry/backoff and error classification
//!
//! Every failure is classified once, on `ApiError`, as either retryable
//! (connection/timeout, HTTP 5xx, HTTP 429) or terminal (other 4xx,
//! response-decoding errors). All three remote calls go through the same
//! `retry_with_policy` helper so the policy lives in exactly one place.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::services::ProductApi;
use crate::infrastructure::api_types::{
    AtlasEnvelope, AtlasPage, CategoryPage, DetailEnvelope, GoodsDetail, ListEnvelope,
};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure taxonomy for upstream calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("rate limited (429)")]
    RateLimited,
    #[error("server error ({status})")]
    Server { status: StatusCode },
    #[error("client error ({status})")]
    Client { status: StatusCode },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The single classification point for the retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::Timeout(_) | ApiError::RateLimited | ApiError::Server { .. }
        )
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }

    fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            ApiError::RateLimited
        } else if status.is_server_error() {
            ApiError::Server { status }
        } else {
            ApiError::Client { status }
        }
    }
}

/// Exponential backoff tuning for upstream calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, initial_delay: Duration::from_millis(1000), backoff: 2.0 }
    }
}

impl RetryPolicy {
    /// Sleep before retry attempt `attempt` (1-based): `initial * backoff^(attempt-1)`.
    fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay.mul_f64(self.backoff.powi(attempt.saturating_sub(1) as i32))
    }
}

/// Run `operation` under the retry policy. Retryable failures sleep and try
/// again up to `max_attempts`; the last error is re-raised on exhaustion.
/// Terminal failures surface immediately.
pub async fn retry_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    call_name: &str,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    call = call_name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retryable API failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(call = call_name, attempt, error = %err, "API call failed");
                return Err(err);
            }
        }
    }
}

/// Read-only client for the FindQC marketplace API.
pub struct FindQcClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl FindQcClient {
    pub fn new(base_url: &str, api_key: Option<&str>, retry: RetryPolicy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {key}")).context("Invalid API key")?,
            );
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .gzip(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), retry })
    }

    /// One GET with query params, status check, and a single decode into the
    /// envelope type.
    async fn get_json<E>(&self, path: &str, query: &[(&str, String)]) -> Result<E, ApiError>
    where
        E: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::from_status(status));
        }

        debug!(url = %url, status = %status, "fetched");
        response
            .json::<E>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ProductApi for FindQcClient {
    async fn fetch_category_page(
        &self,
        catalogue_id: i64,
        page: u32,
        size: u32,
    ) -> Result<CategoryPage, ApiError> {
        let query = [
            ("catalogueId", catalogue_id.to_string()),
            ("page", page.to_string()),
            ("size", size.to_string()),
            ("currencyType", "USD".to_string()),
            ("langType", "en".to_string()),
        ];
        retry_with_policy(&self.retry, "getCategoryProducts", || {
            let query = &query;
            async move {
                self.get_json::<ListEnvelope>("/goods/getCategoryProducts", query)
                    .await
                    .map(CategoryPage::from)
            }
        })
        .await
    }

    async fn fetch_product_detail(
        &self,
        item_id: &str,
        mall_type: &str,
    ) -> Result<GoodsDetail, ApiError> {
        let query = [
            ("itemId", item_id.to_string()),
            ("mallType", mall_type.to_string()),
            ("currencyType", "USD".to_string()),
            ("langType", "en".to_string()),
            ("notNeedQc", "false".to_string()),
        ];
        retry_with_policy(&self.retry, "detail", || {
            let query = &query;
            async move {
                self.get_json::<DetailEnvelope>("/goods/detail", query)
                    .await
                    .map(GoodsDetail::from)
            }
        })
        .await
    }

    async fn fetch_product_atlas(
        &self,
        goods_id: &str,
        item_id: &str,
        mall_type: &str,
        page: u32,
        size: u32,
    ) -> Result<AtlasPage, ApiError> {
        let query = [
            ("goodsId", goods_id.to_string()),
            ("itemId", item_id.to_string()),
            ("mallType", mall_type.to_string()),
            ("page", page.to_string()),
            ("size", size.to_string()),
        ];
        retry_with_policy(&self.retry, "atlas", || {
            let query = &query;
            async move {
                self.get_json::<AtlasEnvelope>("/goods/atlas", query)
                    .await
                    .map(AtlasPage::from)
            }
        })
        .await
    }
}
