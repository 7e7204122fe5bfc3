//! Delivery queue backends.

pub mod file;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use file::FileDeliveryQueue;
pub use memory::InMemoryDeliveryQueue;
#[cfg(feature = "redis")]
pub use self::redis::RedisDeliveryQueue;
