//! Infrastructure layer: upstream HTTP client, persistence, message bus,
//! configuration and logging.

pub mod api_types;
pub mod config;
pub mod database_connection;
pub mod event_publisher;
pub mod http_client;
pub mod logging;
pub mod product_repository;

pub use config::AppConfig;
pub use database_connection::DatabaseConnection;
pub use event_publisher::{AmqpEventPublisher, NoopEventPublisher};
pub use http_client::{ApiError, FindQcClient, RetryPolicy};
pub use product_repository::SqlxProductRepository;
