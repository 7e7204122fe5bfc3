//! Source-of-truth store adapters.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{
    InMemorySourceStore, PlatformConfigRecord, PostRecord, PublishStatus, WorkspaceRecord,
};
#[cfg(feature = "postgres")]
pub use postgres::PostgresSourceStore;
