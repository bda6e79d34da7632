//! Sqlx-backed implementation of the product repository
//!
//! Transaction boundaries are deliberately narrow: the insert path wraps
//! the product row plus its task record; everything else is a single
//! statement. A failed product therefore never poisons its page siblings.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::debug;

use crate::domain::product::{ImageUrls, NewProduct, ProductStatus, StoredProduct, TaskStatus};
use crate::domain::repositories::ProductRepository;

#[derive(Clone)]
pub struct SqlxProductRepository {
    pool: Arc<SqlitePool>,
}

impl SqlxProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<StoredProduct> {
        let image_urls: Option<String> = row.get("image_urls");
        let image_urls = match image_urls {
            Some(json) => serde_json::from_str::<ImageUrls>(&json)
                .context("Malformed image_urls column")?,
            None => ImageUrls::default(),
        };

        Ok(StoredProduct {
            id: row.get("id"),
            findqc_id: row.get("findqc_id"),
            item_id: row.get("item_id"),
            mall_type: row.get("mall_type"),
            category_id: row.get("category_id"),
            price: row.get("price"),
            weight: row.get("weight"),
            image_urls,
            last_qc_time: row.get("last_qc_time"),
            qc_count_30days: row.get("qc_count_30days"),
            status: ProductStatus::from_i64(row.get("status")),
            update_task_id: row.get("update_task_id"),
            last_update: row.get("last_update"),
        })
    }
}

#[async_trait]
impl ProductRepository for SqlxProductRepository {
    async fn find_by_findqc_id(&self, findqc_id: i64) -> Result<Option<StoredProduct>> {
        let row = sqlx::query(
            r#"
            SELECT id, findqc_id, item_id, mall_type, category_id, price, weight,
                   image_urls, last_qc_time, qc_count_30days, status, update_task_id, last_update
            FROM t_products WHERE findqc_id = ?
            "#,
        )
        .bind(findqc_id)
        .fetch_optional(&*self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_product(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert_new(&self, product: &NewProduct, task_id: i64) -> Result<i64> {
        let image_urls =
            serde_json::to_string(&product.image_urls).context("Failed to encode image_urls")?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO t_products
            (findqc_id, item_id, mall_type, category_id, price, weight, image_urls,
             last_qc_time, qc_count_30days, status, update_task_id, last_update)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(product.findqc_id)
        .bind(&product.item_id)
        .bind(&product.mall_type)
        .bind(product.category_id)
        .bind(&product.price)
        .bind(product.weight)
        .bind(&image_urls)
        .bind(product.last_qc_time)
        .bind(product.qc_count_30days)
        .bind(ProductStatus::Active.as_i64())
        .bind(task_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let product_id = result.last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO t_tasks_products (findqc_id, update_task_id, status, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(product.findqc_id)
        .bind(task_id)
        .bind(TaskStatus::Pending.as_i64())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(findqc_id = product.findqc_id, product_id, "inserted new product");
        Ok(product_id)
    }

    async fn refresh_qc(
        &self,
        findqc_id: i64,
        last_qc_time: Option<DateTime<Utc>>,
        qc_count_30days: i64,
        task_id: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE t_products
            SET last_qc_time = ?, qc_count_30days = ?, update_task_id = ?, last_update = ?
            WHERE findqc_id = ?
            "#,
        )
        .bind(last_qc_time)
        .bind(qc_count_30days)
        .bind(task_id)
        .bind(Utc::now())
        .bind(findqc_id)
        .execute(&*self.pool)
        .await?;
        debug!(findqc_id, "refreshed QC fields");
        Ok(())
    }

    async fn soft_delete(&self, findqc_id: i64, task_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE t_products
            SET status = ?, update_task_id = ?, last_update = ?
            WHERE findqc_id = ?
            "#,
        )
        .bind(ProductStatus::SoftDeleted.as_i64())
        .bind(task_id)
        .bind(Utc::now())
        .bind(findqc_id)
        .execute(&*self.pool)
        .await?;
        debug!(findqc_id, "soft-deleted product");
        Ok(())
    }

    async fn resume_category_hint(&self, task_id: i64) -> Result<Option<i64>> {
        let row = sqlx::query(
            r#"
            SELECT MAX(category_id) AS max_category
            FROM t_products WHERE status = ?
            "#,
        )
        .bind(ProductStatus::Active.as_i64())
        .fetch_one(&*self.pool)
        .await?;

        let max_category: Option<i64> = row.get("max_category");
        let Some(max_category) = max_category else {
            return Ok(None);
        };

        let touched = sqlx::query(
            r#"
            SELECT 1 FROM t_products
            WHERE category_id = ? AND update_task_id = ?
            LIMIT 1
            "#,
        )
        .bind(max_category)
        .bind(task_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(touched.map(|_| max_category))
    }
}
