//! In-memory adapter for the `IssueTracker` port.
//!
//! A deterministic test double standing in for one whole tracker instance.
//! Tests seed it with issues, filters, links, metadata and available
//! transitions, run the engine, then inspect the resulting state and the
//! mutation log.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::PortError;
use crate::ports::{
    FieldDelta, Issue, IssueTracker, NewIssue, ProjectMetadata, RemoteLink, Transition,
};

#[derive(Default)]
struct State {
    issues: BTreeMap<String, Issue>,
    links: BTreeMap<String, Vec<RemoteLink>>,
    transitions: BTreeMap<String, Vec<Transition>>,
    filters: BTreeMap<String, Vec<String>>,
    metadata: BTreeMap<String, ProjectMetadata>,
    user: String,
    issue_counters: BTreeMap<String, u64>,
    next_id: u64,
    mutation_log: Vec<String>,
}

/// In-memory tracker instance.
pub struct InMemoryTracker {
    base_url: String,
    state: Mutex<State>,
}

impl InMemoryTracker {
    /// Creates an empty tracker served from the given base URL.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let state = State { user: "syncbot".to_string(), ..State::default() };
        Self { base_url: base_url.to_string(), state: Mutex::new(state) }
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Sets the identity returned by [`IssueTracker::current_user`].
    pub fn set_user(&self, user: &str) {
        self.locked().user = user.to_string();
    }

    /// Seeds an issue, keyed by its `key`.
    pub fn insert_issue(&self, issue: Issue) {
        self.locked().issues.insert(issue.key.clone(), issue);
    }

    /// Seeds a saved filter with the keys it returns, in order.
    pub fn set_filter(&self, filter_id: &str, keys: &[&str]) {
        self.locked()
            .filters
            .insert(filter_id.to_string(), keys.iter().map(ToString::to_string).collect());
    }

    /// Seeds project metadata.
    pub fn set_metadata(&self, metadata: ProjectMetadata) {
        self.locked().metadata.insert(metadata.key.clone(), metadata);
    }

    /// Seeds the workflow transitions available for an issue.
    pub fn set_transitions(&self, key: &str, transitions: Vec<Transition>) {
        self.locked().transitions.insert(key.to_string(), transitions);
    }

    /// Returns a snapshot of one issue.
    #[must_use]
    pub fn issue(&self, key: &str) -> Option<Issue> {
        self.locked().issues.get(key).cloned()
    }

    /// Returns the outbound links of one issue.
    #[must_use]
    pub fn links(&self, key: &str) -> Vec<RemoteLink> {
        self.locked().links.get(key).cloned().unwrap_or_default()
    }

    /// Returns the keys of all issues in a project, in key order.
    #[must_use]
    pub fn issue_keys_in(&self, project_key: &str) -> Vec<String> {
        self.locked()
            .issues
            .values()
            .filter(|issue| issue.project_key == project_key)
            .map(|issue| issue.key.clone())
            .collect()
    }

    /// Returns the log of mutating calls, in call order.
    #[must_use]
    pub fn mutations(&self) -> Vec<String> {
        self.locked().mutation_log.clone()
    }

    fn apply_delta(issue: &mut Issue, fields: &FieldDelta) {
        if let Some(description) = &fields.description {
            issue.description = Some(description.clone());
        }
        if let Some(priority) = &fields.priority {
            issue.priority = Some(priority.clone());
        }
        if let Some(resolution) = &fields.resolution {
            issue.resolution = Some(resolution.clone());
        }
        if let Some(labels) = &fields.labels {
            issue.labels = labels.clone();
        }
        if let Some(versions) = &fields.versions {
            issue.versions = versions.clone();
        }
        if let Some(fix_versions) = &fields.fix_versions {
            issue.fix_versions = fix_versions.clone();
        }
        if let Some(assignee) = &fields.assignee {
            issue.assignee = Some(assignee.clone());
        }
    }
}

impl IssueTracker for InMemoryTracker {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_issues(&self, filter_id: &str) -> Result<Vec<Issue>, PortError> {
        let state = self.locked();
        let keys = state
            .filters
            .get(filter_id)
            .ok_or_else(|| format!("unknown filter {filter_id}"))?;
        keys.iter()
            .map(|key| {
                state
                    .issues
                    .get(key)
                    .cloned()
                    .ok_or_else(|| format!("filter {filter_id} names unknown issue {key}").into())
            })
            .collect()
    }

    fn fetch_issue(&self, key: &str) -> Result<Option<Issue>, PortError> {
        Ok(self.locked().issues.get(key).cloned())
    }

    fn project_metadata(&self, project_key: &str) -> Result<ProjectMetadata, PortError> {
        self.locked()
            .metadata
            .get(project_key)
            .cloned()
            .ok_or_else(|| format!("unknown project {project_key}").into())
    }

    fn outbound_links(&self, key: &str) -> Result<Vec<RemoteLink>, PortError> {
        Ok(self.locked().links.get(key).cloned().unwrap_or_default())
    }

    fn add_link(&self, key: &str, url: &str, title: &str) -> Result<(), PortError> {
        let mut state = self.locked();
        if !state.issues.contains_key(key) {
            return Err(format!("unknown issue {key}").into());
        }
        state
            .links
            .entry(key.to_string())
            .or_default()
            .push(RemoteLink { url: url.to_string(), title: title.to_string() });
        state.mutation_log.push(format!("link {key} -> {url}"));
        Ok(())
    }

    fn available_transitions(&self, key: &str) -> Result<Vec<Transition>, PortError> {
        Ok(self.locked().transitions.get(key).cloned().unwrap_or_default())
    }

    fn create_issue(&self, new_issue: &NewIssue) -> Result<Issue, PortError> {
        let mut state = self.locked();
        let counter = state.issue_counters.entry(new_issue.project_key.clone()).or_insert(0);
        *counter += 1;
        let key = format!("{}-{}", new_issue.project_key, counter);
        state.next_id += 1;
        let issue = Issue {
            id: state.next_id.to_string(),
            key: key.clone(),
            project_key: new_issue.project_key.clone(),
            summary: Some(new_issue.summary.clone()),
            description: new_issue.description.clone(),
            status: Some("Open".to_string()),
            priority: new_issue.priority.clone(),
            resolution: None,
            issue_type: Some(new_issue.issue_type.clone()),
            labels: new_issue.labels.clone(),
            versions: new_issue.versions.clone(),
            fix_versions: new_issue.fix_versions.clone(),
            assignee: None,
        };
        state.issues.insert(key.clone(), issue.clone());
        state.mutation_log.push(format!("create {key}"));
        Ok(issue)
    }

    fn update_issue(&self, key: &str, fields: &FieldDelta) -> Result<(), PortError> {
        let mut state = self.locked();
        let Some(issue) = state.issues.get_mut(key) else {
            return Err(format!("unknown issue {key}").into());
        };
        Self::apply_delta(issue, fields);
        state.mutation_log.push(format!("update {key}"));
        Ok(())
    }

    fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        fields: &FieldDelta,
    ) -> Result<(), PortError> {
        let mut state = self.locked();
        let to_status = state
            .transitions
            .get(key)
            .and_then(|available| available.iter().find(|t| t.id == transition_id))
            .map(|t| t.to_status.clone())
            .ok_or_else(|| format!("transition {transition_id} not available for {key}"))?;
        let Some(issue) = state.issues.get_mut(key) else {
            return Err(format!("unknown issue {key}").into());
        };
        Self::apply_delta(issue, fields);
        issue.status = Some(to_status.clone());
        state.mutation_log.push(format!("transition {key} -> {to_status}"));
        Ok(())
    }

    fn current_user(&self) -> Result<String, PortError> {
        Ok(self.locked().user.clone())
    }
}
