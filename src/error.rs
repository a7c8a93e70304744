//! Fatal error taxonomy for a sync run.
//!
//! Only conditions that must abort the whole run live here. Soft conditions
//! (a mapping table miss, a mapped value missing from the live vocabulary)
//! are accumulated as warning strings on the per-issue outcome instead and
//! never interrupt processing.

use thiserror::Error;

/// Boxed transport-level error surfaced by a tracker port.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;

/// An error that aborts the sync run.
///
/// Already-applied mutations are left in place; convergence completes on the
/// next successful run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The configuration file could not be read or parsed.
    #[error("failed to load config {path}: {reason}")]
    ConfigLoad {
        /// Path of the configuration file.
        path: String,
        /// Underlying read or parse failure.
        reason: String,
    },

    /// The configuration file content failed shape-level validation.
    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    /// More than one status-transition rule matched the current status pair.
    #[error(
        "{issue}: {count} status-transition rules match source status \
         \"{source_status}\" and target status \"{target_status}\"; \
         at most one may match"
    )]
    AmbiguousRule {
        /// Key of the source issue being evaluated.
        issue: String,
        /// Source status at evaluation time.
        source_status: String,
        /// Target status at evaluation time.
        target_status: String,
        /// Number of rules that matched.
        count: usize,
    },

    /// The source workflow does not offer exactly one transition to the
    /// status a fired rule requires.
    #[error(
        "{issue}: {count} available workflow transitions lead to status \
         \"{to_status}\", expected exactly one"
    )]
    TransitionUnavailable {
        /// Key of the issue whose workflow was queried.
        issue: String,
        /// Destination status name required by the fired rule.
        to_status: String,
        /// Number of matching transitions offered.
        count: usize,
    },

    /// The source issue type has no mapping and the configured fallback type
    /// is not a valid issue type in the target project.
    #[error(
        "{issue}: issue type is unmapped and fallback type \"{fallback}\" \
         does not exist in target project {project}"
    )]
    FallbackTypeInvalid {
        /// Key of the source issue being created in the target.
        issue: String,
        /// Configured fallback issue type name.
        fallback: String,
        /// Target project key.
        project: String,
    },

    /// A priority could not be mapped during reconciliation. Priority is
    /// mandatory on update, unlike other fields.
    #[error("{issue}: priority \"{priority}\" has no usable mapping in project {project}")]
    UnmappedPriority {
        /// Key of the source issue being reconciled.
        issue: String,
        /// Source priority name that failed to map.
        priority: String,
        /// Destination project key.
        project: String,
    },

    /// An issue's outbound links resolve to more than one distinct
    /// counterpart.
    #[error("{issue}: links resolve to multiple counterparts ({keys}); an issue must have at most one")]
    AmbiguousCounterpart {
        /// Key of the issue whose links were resolved.
        issue: String,
        /// Comma-joined keys of the distinct resolved counterparts.
        keys: String,
    },

    /// An issue's only counterpart link points at a key that no longer
    /// resolves (deleted or renamed issue).
    #[error("{issue}: counterpart link points at \"{key}\", which no longer exists")]
    DanglingLink {
        /// Key of the issue whose link is dangling.
        issue: String,
        /// Key extracted from the dangling link URL.
        key: String,
    },

    /// The target issue's backlink resolves to a different source issue than
    /// the one being processed.
    #[error(
        "{target}: backlink resolves to \"{found}\" but \"{expected}\" was \
         being processed; refusing to overwrite a cross-linked pair"
    )]
    BacklinkMismatch {
        /// Key of the target issue whose backlink was verified.
        target: String,
        /// Key of the source issue being processed.
        expected: String,
        /// Key the backlink actually resolved to.
        found: String,
    },

    /// A filter returned an issue outside its configured source project.
    #[error(
        "filter \"{filter}\" returned {issue} from project {actual}, \
         expected project {expected}"
    )]
    ForeignIssue {
        /// Key of the offending issue.
        issue: String,
        /// Identifier of the configured source filter.
        filter: String,
        /// Configured source project key.
        expected: String,
        /// Project key the issue actually belongs to.
        actual: String,
    },

    /// A tracker returned an issue missing fields the reconciliation
    /// strategy requires (key, summary, priority, status).
    #[error("{issue}: tracker returned incomplete data, missing {missing}")]
    IncompleteIssue {
        /// Key of the incomplete issue.
        issue: String,
        /// Comma-joined names of the missing fields.
        missing: String,
    },

    /// A tracker call failed at the transport level. Not retried here;
    /// retry and backoff belong to the transport collaborator.
    #[error("{context}")]
    Tracker {
        /// What the engine was doing when the call failed.
        context: String,
        /// The underlying transport error.
        #[source]
        source: PortError,
    },
}

impl SyncError {
    /// Wraps a tracker port error with engine-level context.
    pub fn tracker(context: impl Into<String>, source: PortError) -> Self {
        Self::Tracker { context: context.into(), source }
    }
}
