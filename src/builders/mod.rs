//! Builders to construct pipeline components from configuration.

pub mod component_builder;

pub use component_builder::{build_queue, build_router};
