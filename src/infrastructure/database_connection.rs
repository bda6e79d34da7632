//! Database connection and pool management
//!
//! SQLite via sqlx. The schema is created in place at startup; there is no
//! separate migration tool for this service.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db_path = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");

        // In-memory databases have no file to prepare.
        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            if !Path::new(db_path).exists() {
                std::fs::File::create(db_path)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        let create_products_sql = r#"
            CREATE TABLE IF NOT EXISTS t_products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                findqc_id INTEGER NOT NULL UNIQUE,
                item_id TEXT NOT NULL,
                mall_type TEXT NOT NULL,
                category_id INTEGER,
                price TEXT,
                weight REAL,
                image_urls TEXT,
                last_qc_time DATETIME,
                qc_count_30days INTEGER NOT NULL DEFAULT 0,
                status INTEGER NOT NULL DEFAULT 0,
                update_task_id INTEGER NOT NULL DEFAULT 0,
                last_update DATETIME
            )
        "#;

        let create_tasks_sql = r#"
            CREATE TABLE IF NOT EXISTS t_tasks_products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                findqc_id INTEGER NOT NULL REFERENCES t_products (findqc_id) ON DELETE CASCADE,
                update_task_id INTEGER NOT NULL,
                status INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
        "#;

        let create_indexes_sql = r#"
            CREATE INDEX IF NOT EXISTS idx_products_item_mall ON t_products (item_id, mall_type);
            CREATE INDEX IF NOT EXISTS idx_products_category ON t_products (category_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_findqc ON t_tasks_products (findqc_id)
        "#;

        sqlx::query(create_products_sql).execute(&self.pool).await?;
        sqlx::query(create_tasks_sql).execute(&self.pool).await?;
        for statement in create_indexes_sql.split(';') {
            let statement = statement.trim();
            if !statement.is_empty() {
                sqlx::query(statement).execute(&self.pool).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_database_connection_and_migration() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("spider.db");
        let database_url = format!("sqlite:{}", db_path.display());

        let db = DatabaseConnection::new(&database_url).await?;
        db.migrate().await?;

        let result = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='t_products'",
        )
        .fetch_optional(db.pool())
        .await?;
        assert!(result.is_some());

        let result = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='t_tasks_products'",
        )
        .fetch_optional(db.pool())
        .await?;
        assert!(result.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_migration_is_idempotent() -> Result<()> {
        let db = DatabaseConnection::new("sqlite::memory:").await?;
        db.migrate().await?;
        db.migrate().await?;
        Ok(())
    }
}
