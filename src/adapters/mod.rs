//! Adapter implementations of the port traits.

pub mod cache;
pub mod jira;
pub mod memory;

pub use cache::{PassthroughCache, TtlCache};
pub use jira::JiraTracker;
pub use memory::InMemoryTracker;
