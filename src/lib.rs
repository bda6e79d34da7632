//! findqc-spider: crawl-and-ingest service for FindQC product listings
//! and QC photo metadata.
//!
//! The crate is split the usual way: `domain` holds entities and trait
//! seams, `infrastructure` the HTTP client, persistence and message bus,
//! `application` the traversal/pipeline/coordinator orchestration.

pub mod application;
pub mod domain;
pub mod infrastructure;
