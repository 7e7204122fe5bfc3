//! Infrastructure adapters for queues, source stores and delivery platforms.

pub mod platforms;
pub mod queue;
pub mod source;

pub use platforms::PlatformClient;
pub use queue::{FileDeliveryQueue, InMemoryDeliveryQueue};
pub use source::InMemorySourceStore;
