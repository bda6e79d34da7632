//! Service entry point
//!
//! One crawl run per invocation; an external scheduler re-invokes the
//! process. Database failure at startup is fatal; a missing broker only
//! downgrades publishing to a no-op.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use findqc_spider::application::{
    CategoryTraversal, ConcurrencyCoordinator, IngestionPipeline, RunContext,
};
use findqc_spider::domain::repositories::ProductRepository;
use findqc_spider::domain::services::{EventPublisher, ProductApi};
use findqc_spider::infrastructure::{
    AmqpEventPublisher, AppConfig, DatabaseConnection, FindQcClient, NoopEventPublisher,
    RetryPolicy, SqlxProductRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    findqc_spider::infrastructure::logging::init_logging()?;
    let config = AppConfig::from_env();
    info!("findqc-spider starting");

    let db = DatabaseConnection::new(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to migrate database")?;
    let repository: Arc<dyn ProductRepository> =
        Arc::new(SqlxProductRepository::new(db.pool().clone()));

    let publisher: Arc<dyn EventPublisher> = match AmqpEventPublisher::connect(&config.amqp_url).await
    {
        Ok(publisher) => Arc::new(publisher),
        Err(err) => {
            warn!(error = %err, "broker unavailable, new-product events will be dropped");
            Arc::new(NoopEventPublisher)
        }
    };

    let retry = RetryPolicy {
        max_attempts: config.retry_max_attempts,
        initial_delay: std::time::Duration::from_millis(config.retry_initial_delay_ms),
        backoff: config.retry_backoff,
    };
    let api: Arc<dyn ProductApi> =
        Arc::new(FindQcClient::new(&config.api_base_url, config.api_key.as_deref(), retry)?);

    // Batch identifier: wall-clock hour of the run, e.g. 2025111410.
    let task_id: i64 = Utc::now().format("%Y%m%d%H").to_string().parse().unwrap_or(0);
    info!(task_id, "batch identifier assigned");

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight work");
            ctrl_c_token.cancel();
        }
    });

    let ctx = Arc::new(RunContext::new(task_id, config.max_products, cancel));

    // Coarse resume hint: if the newest Active category was touched by this
    // batch, a previous run of the same batch was interrupted there.
    let start_cat_id = match repository.resume_category_hint(task_id).await {
        Ok(Some(resume_from)) if resume_from > config.start_cat_id => {
            info!(resume_from, "resuming from checkpoint category");
            resume_from
        }
        Ok(_) => config.start_cat_id,
        Err(err) => {
            warn!(error = %err, "checkpoint lookup failed, starting from configured range");
            config.start_cat_id
        }
    };

    let pipeline = Arc::new(IngestionPipeline::new(
        Arc::clone(&api),
        Arc::clone(&repository),
        Arc::clone(&publisher),
        config.atlas_page_size,
        config.request_delay(),
    ));
    let traversal = Arc::new(CategoryTraversal::new(
        Arc::clone(&api),
        pipeline,
        config.page_size,
        config.request_delay(),
    ));
    let coordinator = ConcurrencyCoordinator::new(traversal, config.max_concurrent_categories);

    let categories: Vec<i64> = (start_cat_id..=config.end_cat_id).collect();
    let summary = coordinator.run(categories, ctx).await?;

    info!(
        completed = summary.categories_completed,
        failed = summary.categories_failed,
        items = summary.items_processed,
        "run complete"
    );
    Ok(())
}
