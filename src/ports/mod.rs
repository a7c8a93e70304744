//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the engine core and an external
//! system (the two trackers, the transport-side response cache).
//! Implementations live in `src/adapters/`.

pub mod cache;
pub mod tracker;

pub use cache::ResponseCache;
pub use tracker::{
    FieldDelta, Issue, IssueTracker, NewIssue, ProjectMetadata, RemoteLink, Transition,
};
