//! Domain layer: entities, events, and the trait seams the application
//! layer is written against.

pub mod events;
pub mod product;
pub mod repositories;
pub mod services;

pub use events::NewProductMessage;
pub use product::{
    ImageUrls, LifecycleOutcome, NewProduct, ProductStatus, StoredProduct, TaskStatus,
};
pub use repositories::ProductRepository;
pub use services::{EventPublisher, ProductApi};
