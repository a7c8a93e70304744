//! Missing-counterpart strategy: create a target issue and link both sides.

use crate::config::{ProjectSyncConfig, ValueCategory};
use crate::error::SyncError;
use crate::ports::{Issue, IssueTracker, NewIssue};
use crate::sync::{describe, links, mapper, IssueOutcome, SyncResult};

/// Builds and creates the target counterpart of a source issue, then anchors
/// the pair with a bidirectional remote link. The link pair is what prevents
/// re-creation on the next pass.
///
/// # Errors
///
/// Returns [`SyncError::FallbackTypeInvalid`] when the issue type is
/// unmapped and the configured fallback is not a live target type, and a
/// tracker error when any call to either system fails.
pub fn run(
    source: &dyn IssueTracker,
    target: &dyn IssueTracker,
    config: &ProjectSyncConfig,
    issue: &Issue,
) -> Result<IssueOutcome, SyncError> {
    let metadata = target.project_metadata(&config.target_project).map_err(|e| {
        SyncError::tracker(format!("fetching metadata of project {}", config.target_project), e)
    })?;

    let mut warnings = Vec::new();

    let issue_type = issue
        .issue_type
        .as_deref()
        .and_then(|raw| {
            mapper::map_value(
                ValueCategory::IssueType,
                &config.mappings,
                &metadata,
                raw,
                &mut warnings,
            )
        })
        .map_or_else(
            || {
                if metadata.issue_types.iter().any(|t| *t == config.fallback_issue_type) {
                    warnings.push(format!(
                        "using fallback issue type \"{}\"",
                        config.fallback_issue_type
                    ));
                    Ok(config.fallback_issue_type.clone())
                } else {
                    Err(SyncError::FallbackTypeInvalid {
                        issue: issue.key.clone(),
                        fallback: config.fallback_issue_type.clone(),
                        project: config.target_project.clone(),
                    })
                }
            },
            Ok,
        )?;

    let summary = format!("{}: {}", issue.key, issue.summary.as_deref().unwrap_or_default());
    let description = describe::wrap(
        &issue.key,
        &links::browse_url(source.base_url(), &issue.key),
        issue.description.as_deref().unwrap_or_default(),
    );
    let priority = issue.priority.as_deref().and_then(|raw| {
        mapper::map_value(ValueCategory::Priority, &config.mappings, &metadata, raw, &mut warnings)
    });
    let versions = mapper::map_set(
        ValueCategory::Version,
        &config.mappings,
        &metadata,
        &issue.versions,
        &mut warnings,
    );
    let fix_versions = mapper::map_set(
        ValueCategory::Version,
        &config.mappings,
        &metadata,
        &issue.fix_versions,
        &mut warnings,
    );

    let new_issue = NewIssue {
        project_key: config.target_project.clone(),
        issue_type,
        summary,
        description: Some(description),
        priority,
        labels: issue.labels.clone(),
        versions,
        fix_versions,
    };

    let created = target
        .create_issue(&new_issue)
        .map_err(|e| SyncError::tracker(format!("creating counterpart of {}", issue.key), e))?;

    // Both directions immediately: a pass interrupted between the two calls
    // is repaired by the existing-counterpart strategy's backlink check.
    source
        .add_link(&issue.key, &links::browse_url(target.base_url(), &created.key), &created.key)
        .map_err(|e| SyncError::tracker(format!("linking {} to {}", issue.key, created.key), e))?;
    target
        .add_link(&created.key, &links::browse_url(source.base_url(), &issue.key), &issue.key)
        .map_err(|e| SyncError::tracker(format!("linking {} to {}", created.key, issue.key), e))?;

    Ok(IssueOutcome { result: SyncResult::Created, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryTracker;
    use crate::ports::ProjectMetadata;
    use std::collections::BTreeMap;

    fn config() -> ProjectSyncConfig {
        ProjectSyncConfig {
            source_project: "PROJECT_ONE".to_string(),
            target_project: "PRJ_ONE".to_string(),
            source_filter: "10200".to_string(),
            fallback_issue_type: "Task".to_string(),
            keep_labels: vec![],
            status_transitions: vec![],
            mappings: crate::config::FieldMappings {
                issue_types: BTreeMap::from([("Bug".to_string(), "Defect".to_string())]),
                priorities: BTreeMap::from([("High".to_string(), "Urgent".to_string())]),
                ..crate::config::FieldMappings::default()
            },
        }
    }

    fn target_with_metadata() -> InMemoryTracker {
        let target = InMemoryTracker::new("https://jira-target");
        target.set_metadata(ProjectMetadata {
            key: "PRJ_ONE".to_string(),
            issue_types: vec!["Defect".to_string(), "Task".to_string()],
            priorities: vec!["Urgent".to_string()],
            ..ProjectMetadata::default()
        });
        target
    }

    fn source_with(issue: Issue) -> InMemoryTracker {
        let source = InMemoryTracker::new("https://jira-source");
        source.insert_issue(issue);
        source
    }

    fn bug(key: &str) -> Issue {
        Issue {
            id: "1".to_string(),
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
    fn creates_counterpart_with_mapped_fields_and_links() {
        let issue = bug("PROJECT_ONE-1");
        let source = source_with(issue.clone());
        let target = target_with_metadata();

        let outcome = run(&source, &target, &config(), &issue).unwrap();
        assert_eq!(outcome.result, SyncResult::Created);
        assert!(outcome.warnings.is_empty());

        let created = target.issue("PRJ_ONE-1").expect("counterpart exists");
        assert_eq!(created.summary.as_deref(), Some("PROJECT_ONE-1: My first bug"));
        assert_eq!(created.issue_type.as_deref(), Some("Defect"));
        assert_eq!(created.priority.as_deref(), Some("Urgent"));
        assert!(created.description.unwrap().contains("Something broke"));

        let source_links = source.links("PROJECT_ONE-1");
        assert_eq!(source_links.len(), 1);
        assert_eq!(source_links[0].url, "https://jira-target/browse/PRJ_ONE-1");
        let target_links = target.links("PRJ_ONE-1");
        assert_eq!(target_links.len(), 1);
        assert_eq!(target_links[0].url, "https://jira-source/browse/PROJECT_ONE-1");
    }

    #[test]
    fn unmapped_type_falls_back_with_warning() {
        let mut issue = bug("PROJECT_ONE-2");
        issue.issue_type = Some("Epic".to_string());
        let source = source_with(issue.clone());
        let target = target_with_metadata();

        let outcome = run(&source, &target, &config(), &issue).unwrap();
        assert_eq!(outcome.result, SyncResult::Created);
        assert!(outcome.warnings.iter().any(|w| w.contains("fallback issue type")));
        let created = target.issue("PRJ_ONE-1").unwrap();
        assert_eq!(created.issue_type.as_deref(), Some("Task"));
    }

    #[test]
    fn invalid_fallback_type_is_fatal() {
        let mut issue = bug("PROJECT_ONE-3");
        issue.issue_type = Some("Epic".to_string());
        let source = source_with(issue.clone());
        let target = target_with_metadata();
        let mut config = config();
        config.fallback_issue_type = "Story".to_string();

        let err = run(&source, &target, &config, &issue).unwrap_err();
        assert!(matches!(err, SyncError::FallbackTypeInvalid { .. }));
        assert!(target.mutations().is_empty());
    }

    #[test]
    fn unmapped_priority_is_omitted_not_fatal() {
        let mut issue = bug("PROJECT_ONE-4");
        issue.priority = Some("Blocker".to_string());
        let source = source_with(issue.clone());
        let target = target_with_metadata();

        let outcome = run(&source, &target, &config(), &issue).unwrap();
        assert_eq!(outcome.result, SyncResult::Created);
        assert!(outcome.warnings.iter().any(|w| w.contains("no mapping entry")));
        let created = target.issue("PRJ_ONE-1").unwrap();
        assert_eq!(created.priority, None);
    }
}
