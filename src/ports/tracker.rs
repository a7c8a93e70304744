//! Tracker port: the collaborator interface onto one issue-tracking instance.
//!
//! The engine is indifferent to which instance plays "source" or "target";
//! both sides are consumed through this same trait. Implementations live in
//! `src/adapters/`.

use serde::{Deserialize, Serialize};

use crate::config::ValueCategory;
use crate::error::PortError;

/// An issue snapshot as returned by a tracker.
///
/// The engine never mutates an `Issue`; convergence is expressed only by
/// building [`FieldDelta`] requests against the owning tracker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Tracker-internal id.
    pub id: String,
    /// Human-readable key, e.g. `PROJECT_ONE-1`.
    pub key: String,
    /// Key of the owning project.
    pub project_key: String,
    /// One-line summary.
    pub summary: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Current workflow status name.
    pub status: Option<String>,
    /// Priority name.
    pub priority: Option<String>,
    /// Resolution name, if resolved.
    pub resolution: Option<String>,
    /// Issue type name.
    pub issue_type: Option<String>,
    /// Label set.
    pub labels: Vec<String>,
    /// Affected version names.
    pub versions: Vec<String>,
    /// Fix version names.
    pub fix_versions: Vec<String>,
    /// Assignee user name, if assigned.
    pub assignee: Option<String>,
}

/// Payload for creating a new issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIssue {
    /// Key of the project to create in.
    pub project_key: String,
    /// Issue type name.
    pub issue_type: String,
    /// One-line summary.
    pub summary: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Priority name; omitted from the request when `None`.
    pub priority: Option<String>,
    /// Label set.
    pub labels: Vec<String>,
    /// Affected version names.
    pub versions: Vec<String>,
    /// Fix version names.
    pub fix_versions: Vec<String>,
}

/// Field values to write on an existing issue. `None` leaves a field
/// untouched; status is deliberately absent, it only changes through a
/// workflow transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDelta {
    /// New description.
    pub description: Option<String>,
    /// New priority name.
    pub priority: Option<String>,
    /// New resolution name.
    pub resolution: Option<String>,
    /// Replacement label set.
    pub labels: Option<Vec<String>>,
    /// Replacement affected-version set.
    pub versions: Option<Vec<String>>,
    /// Replacement fix-version set.
    pub fix_versions: Option<Vec<String>>,
    /// New assignee user name.
    pub assignee: Option<String>,
}

impl FieldDelta {
    /// Returns `true` when no field would be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.priority.is_none()
            && self.resolution.is_none()
            && self.labels.is_none()
            && self.versions.is_none()
            && self.fix_versions.is_none()
            && self.assignee.is_none()
    }
}

/// A directed external link from an issue to a URL.
///
/// The only state this engine persists: the bidirectional pair of these
/// links is the idempotency marker tying a source issue to its counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteLink {
    /// Destination URL.
    pub url: String,
    /// Human-readable link title.
    pub title: String,
}

/// One workflow transition currently offered for an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Tracker-internal transition id.
    pub id: String,
    /// Transition name.
    pub name: String,
    /// Name of the status the transition leads to.
    pub to_status: String,
}

/// Live vocabulary of a project, used to validate mapped values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Project key.
    pub key: String,
    /// Valid issue type names.
    pub issue_types: Vec<String>,
    /// Valid priority names.
    pub priorities: Vec<String>,
    /// Valid resolution names.
    pub resolutions: Vec<String>,
    /// Valid version names.
    pub versions: Vec<String>,
    /// Valid component names.
    pub components: Vec<String>,
}

impl ProjectMetadata {
    /// Returns the allowed value names for one category.
    #[must_use]
    pub fn allowed(&self, category: ValueCategory) -> &[String] {
        match category {
            ValueCategory::IssueType => &self.issue_types,
            ValueCategory::Priority => &self.priorities,
            ValueCategory::Resolution => &self.resolutions,
            ValueCategory::Version => &self.versions,
            ValueCategory::Component => &self.components,
        }
    }
}

/// Synchronous, blocking interface onto one issue-tracking instance.
///
/// Paging, authentication, caching and retries are adapter concerns; callers
/// always see complete results.
pub trait IssueTracker: Send + Sync {
    /// Base URL of this instance, used to build and recognize browse links.
    fn base_url(&self) -> &str;

    /// Fetches all issues matched by a saved filter, in filter order.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter query fails.
    fn search_issues(&self, filter_id: &str) -> Result<Vec<Issue>, PortError>;

    /// Fetches one issue by key. `Ok(None)` means the key does not resolve.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure; a missing issue is not an error.
    fn fetch_issue(&self, key: &str) -> Result<Option<Issue>, PortError>;

    /// Fetches the live vocabulary of a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the project cannot be read.
    fn project_metadata(&self, project_key: &str) -> Result<ProjectMetadata, PortError>;

    /// Fetches the outbound external links of an issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the links cannot be listed.
    fn outbound_links(&self, key: &str) -> Result<Vec<RemoteLink>, PortError>;

    /// Adds an external link from an issue to a URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be created.
    fn add_link(&self, key: &str, url: &str, title: &str) -> Result<(), PortError>;

    /// Fetches the workflow transitions currently available for an issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow cannot be queried.
    fn available_transitions(&self, key: &str) -> Result<Vec<Transition>, PortError>;

    /// Creates an issue and returns it with its assigned key.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue cannot be created.
    fn create_issue(&self, new_issue: &NewIssue) -> Result<Issue, PortError>;

    /// Writes the given field values on an existing issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue cannot be found or updated.
    fn update_issue(&self, key: &str, fields: &FieldDelta) -> Result<(), PortError>;

    /// Applies a workflow transition, optionally bundled with field values.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow rejects the transition.
    fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        fields: &FieldDelta,
    ) -> Result<(), PortError>;

    /// Resolves the acting user's own identity, for self-assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be resolved.
    fn current_user(&self) -> Result<String, PortError>;
}

#[cfg(test)]
mod tests {
    use super::FieldDelta;

    #[test]
    fn default_delta_is_empty() {
        assert!(FieldDelta::default().is_empty());
    }

    #[test]
    fn delta_with_any_field_is_not_empty() {
        let delta = FieldDelta { priority: Some("High".to_string()), ..FieldDelta::default() };
        assert!(!delta.is_empty());
        let delta = FieldDelta { labels: Some(vec![]), ..FieldDelta::default() };
        assert!(!delta.is_empty());
    }
}
