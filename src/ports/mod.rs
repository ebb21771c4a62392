//! Stable port identifiers and the authoring operations that preserve them.

mod allocator;
mod migrate;

pub use allocator::PortAllocator;
pub use migrate::migrate_legacy_ports;
