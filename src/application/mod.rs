//! Application layer: the crawl orchestration built on the domain traits.

pub mod context;
pub mod coordinator;
pub mod pipeline;
pub mod traversal;

pub use context::RunContext;
pub use coordinator::{ConcurrencyCoordinator, CrawlSummary};
pub use pipeline::IngestionPipeline;
pub use traversal::CategoryTraversal;
