//! Sync orchestration across configured project pairs.

use chrono::Utc;
use tracing::{info, warn};

use crate::config::ProjectSyncConfig;
use crate::error::SyncError;
use crate::ports::IssueTracker;
use crate::sync::{create, links, update, ProjectReport, RunReport};

/// Drives a full sync run over one source/target tracker pair.
///
/// Holds no state of its own; everything the engine knows between runs
/// lives in the two trackers' link graphs.
pub struct SyncEngine<'a> {
    source: &'a dyn IssueTracker,
    target: &'a dyn IssueTracker,
}

impl<'a> SyncEngine<'a> {
    /// Creates an engine over the two tracker handles.
    #[must_use]
    pub fn new(source: &'a dyn IssueTracker, target: &'a dyn IssueTracker) -> Self {
        Self { source, target }
    }

    /// Processes every configured project pair in order.
    ///
    /// # Errors
    ///
    /// Aborts on the first fatal error; mutations applied so far are left in
    /// place and the next successful run converges.
    pub fn run(&self, projects: &[ProjectSyncConfig]) -> Result<RunReport, SyncError> {
        let mut report = RunReport::new(Utc::now());
        for config in projects {
            report.projects.push(self.run_project(config)?);
        }
        Ok(report)
    }

    /// Processes one project pair: fetch, resolve, dispatch, tally.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal error of any issue; a misconfigured filter
    /// returning a foreign-project issue aborts immediately.
    pub fn run_project(&self, config: &ProjectSyncConfig) -> Result<ProjectReport, SyncError> {
        let issues = self.source.search_issues(&config.source_filter).map_err(|e| {
            SyncError::tracker(format!("running source filter {}", config.source_filter), e)
        })?;
        info!(
            source = %config.source_project,
            target = %config.target_project,
            candidates = issues.len(),
            "processing project pair"
        );

        let mut report = ProjectReport::new(&config.source_project, &config.target_project);
        for issue in &issues {
            if issue.project_key != config.source_project {
                return Err(SyncError::ForeignIssue {
                    issue: issue.key.clone(),
                    filter: config.source_filter.clone(),
                    expected: config.source_project.clone(),
                    actual: issue.project_key.clone(),
                });
            }

            let counterpart = links::resolve_counterpart(&issue.key, self.source, self.target)?;
            let outcome = match counterpart {
                None => create::run(self.source, self.target, config, issue)?,
                Some(existing) => {
                    update::run(self.source, self.target, config, issue, &existing)?
                }
            };

            for warning in &outcome.warnings {
                warn!(issue = %issue.key, "{warning}");
            }
            info!(issue = %issue.key, result = %outcome.result, "processed");
            report.record(outcome.result);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryTracker;
    use crate::config::FieldMappings;
    use crate::ports::{Issue, ProjectMetadata};
    use crate::sync::SyncResult;
    use std::collections::BTreeMap;

    fn config() -> ProjectSyncConfig {
        ProjectSyncConfig {
            source_project: "PROJECT_ONE".to_string(),
            target_project: "PRJ_ONE".to_string(),
            source_filter: "10200".to_string(),
            fallback_issue_type: "Task".to_string(),
            keep_labels: vec![],
            status_transitions: vec![],
            mappings: FieldMappings {
                issue_types: BTreeMap::from([("Bug".to_string(), "Defect".to_string())]),
                priorities: BTreeMap::from([("High".to_string(), "Urgent".to_string())]),
                ..FieldMappings::default()
            },
        }
    }

    fn trackers() -> (InMemoryTracker, InMemoryTracker) {
        let source = InMemoryTracker::new("https://jira-source");
        let target = InMemoryTracker::new("https://jira-target");
        target.set_metadata(ProjectMetadata {
            key: "PRJ_ONE".to_string(),
            issue_types: vec!["Defect".to_string(), "Task".to_string()],
            priorities: vec!["Urgent".to_string()],
            ..ProjectMetadata::default()
        });
        (source, target)
    }

    fn source_bug(key: &str) -> Issue {
        Issue {
            id: key.to_string(),
            key: key.to_string(),
            project_key: "PROJECT_ONE".to_string(),
            summary: Some("My first bug".to_string()),
            description: Some("Something broke".to_string()),
            status: Some("Open".to_string()),
            priority: Some("High".to_string()),
            issue_type: Some("Bug".to_string()),
            ..Issue::default()
        }
    }

    #[test]
    fn dispatches_create_then_update() {
        let (source, target) = trackers();
        source.insert_issue(source_bug("PROJECT_ONE-1"));
        source.set_filter("10200", &["PROJECT_ONE-1"]);

        let engine = SyncEngine::new(&source, &target);
        let first = engine.run_project(&config()).unwrap();
        assert_eq!(first.count(SyncResult::Created), 1);

        let second = engine.run_project(&config()).unwrap();
        assert_eq!(second.count(SyncResult::Created), 0);
        assert_eq!(second.count(SyncResult::Unchanged), 1);
        assert_eq!(target.issue_keys_in("PRJ_ONE").len(), 1);
    }

    #[test]
    fn foreign_project_issue_aborts_the_run() {
        let (source, target) = trackers();
        let mut stray = source_bug("OTHER-1");
        stray.project_key = "OTHER".to_string();
        source.insert_issue(stray);
        source.set_filter("10200", &["OTHER-1"]);

        let engine = SyncEngine::new(&source, &target);
        let err = engine.run_project(&config()).unwrap_err();
        assert!(matches!(err, SyncError::ForeignIssue { .. }));
        assert!(target.mutations().is_empty());
    }

    #[test]
    fn processes_issues_in_filter_order() {
        let (source, target) = trackers();
        source.insert_issue(source_bug("PROJECT_ONE-2"));
        source.insert_issue(source_bug("PROJECT_ONE-1"));
        source.set_filter("10200", &["PROJECT_ONE-2", "PROJECT_ONE-1"]);

        let engine = SyncEngine::new(&source, &target);
        engine.run_project(&config()).unwrap();
        // PROJECT_ONE-2 was processed first, so it owns the first key.
        let links = source.links("PROJECT_ONE-2");
        assert_eq!(links[0].url, "https://jira-target/browse/PRJ_ONE-1");
    }

    #[test]
    fn run_covers_all_configured_pairs() {
        let (source, target) = trackers();
        source.set_filter("10200", &[]);
        let engine = SyncEngine::new(&source, &target);
        let report = engine.run(&[config()]).unwrap();
        assert_eq!(report.projects.len(), 1);
        assert_eq!(report.projects[0].total(), 0);
    }
}
