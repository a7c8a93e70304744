//! Existing-counterpart strategy: reconcile an already-linked pair.
//!
//! Composes minimal field diffs, evaluates status-transition rules, verifies
//! the backlink and issues at most one update per side. Running it twice
//! without external changes yields `Unchanged` the second time.

use std::collections::BTreeSet;

use crate::config::{ProjectSyncConfig, ValueCategory};
use crate::error::SyncError;
use crate::ports::{FieldDelta, Issue, IssueTracker, ProjectMetadata};
use crate::sync::{describe, links, mapper, transitions, IssueOutcome, IssueUpdate, SyncResult};

/// Reconciles one source issue with its existing target counterpart.
///
/// # Errors
///
/// Fatal conditions: incomplete issue data on either side, an ambiguous
/// rule match, a missing or duplicated workflow transition for a fired
/// rule, an unmappable priority, a backlink resolving to a different source
/// issue, and any tracker transport failure.
pub fn run(
    source: &dyn IssueTracker,
    target: &dyn IssueTracker,
    config: &ProjectSyncConfig,
    source_issue: &Issue,
    target_issue: &Issue,
) -> Result<IssueOutcome, SyncError> {
    require_complete(source_issue)?;
    require_complete(target_issue)?;

    let mut warnings = Vec::new();

    // 1. Status-transition evaluation.
    let source_update =
        evaluate_transition(source, config, source_issue, target_issue, &mut warnings)?;

    // 2. Field diffs toward the target, independent of the transition.
    let target_update = compute_target_diff(source, target, config, source_issue, target_issue, &mut warnings)?;

    // 3. Backlink verification and self-healing.
    verify_backlink(source, target, source_issue, target_issue, &mut warnings)?;

    // 4. Apply.
    apply(source, target, source_issue, target_issue, source_update, target_update, warnings)
}

/// Asserts the fields the reconciliation relies on are present.
fn require_complete(issue: &Issue) -> Result<(), SyncError> {
    let mut missing = Vec::new();
    if issue.key.is_empty() {
        missing.push("key");
    }
    if issue.summary.is_none() {
        missing.push("summary");
    }
    if issue.priority.is_none() {
        missing.push("priority");
    }
    if issue.status.is_none() {
        missing.push("status");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SyncError::IncompleteIssue { issue: issue.key.clone(), missing: missing.join(", ") })
    }
}

fn evaluate_transition(
    source: &dyn IssueTracker,
    config: &ProjectSyncConfig,
    source_issue: &Issue,
    target_issue: &Issue,
    warnings: &mut Vec<String>,
) -> Result<IssueUpdate, SyncError> {
    let source_status = source_issue.status.as_deref().unwrap_or_default();
    let target_status = target_issue.status.as_deref().unwrap_or_default();
    let Some(rule) = transitions::match_rule(
        &source_issue.key,
        &config.status_transitions,
        source_status,
        target_status,
        target_issue.assignee.is_some(),
    )?
    else {
        return Ok(IssueUpdate::default());
    };

    let mut update = IssueUpdate::default();

    if rule.assign_to_myself_in_source {
        let myself = source
            .current_user()
            .map_err(|e| SyncError::tracker("resolving the syncing identity", e))?;
        if source_issue.assignee.as_deref() != Some(myself.as_str()) {
            let delta = FieldDelta { assignee: Some(myself), ..FieldDelta::default() };
            source.update_issue(&source_issue.key, &delta).map_err(|e| {
                SyncError::tracker(format!("self-assigning {}", source_issue.key), e)
            })?;
        }
    }

    let available = source.available_transitions(&source_issue.key).map_err(|e| {
        SyncError::tracker(format!("listing transitions of {}", source_issue.key), e)
    })?;
    update.transition = Some(transitions::select_transition(
        &source_issue.key,
        &available,
        &rule.transition_source_to,
    )?);

    // Copy-back fields ride along on the transition, written in the source
    // vocabulary via reverse lookup.
    let source_vocabulary = if rule.copy_resolution_to_source || rule.copy_fix_versions_to_source {
        Some(source.project_metadata(&config.source_project).map_err(|e| {
            SyncError::tracker(
                format!("fetching metadata of project {}", config.source_project),
                e,
            )
        })?)
    } else {
        None
    };

    if let Some(metadata) = &source_vocabulary {
        if rule.copy_resolution_to_source {
            if let Some(target_resolution) = target_issue.resolution.as_deref() {
                if let Some(mapped) = mapper::map_value_reverse(
                    ValueCategory::Resolution,
                    &config.mappings,
                    metadata,
                    target_resolution,
                    warnings,
                ) {
                    if source_issue.resolution.as_deref() != Some(mapped.as_str()) {
                        update.fields.resolution = Some(mapped);
                    }
                }
            }
        }
        if rule.copy_fix_versions_to_source
            && !(target_issue.fix_versions.is_empty() && source_issue.fix_versions.is_empty())
        {
            let mapped = mapper::map_set_reverse(
                ValueCategory::Version,
                &config.mappings,
                metadata,
                &target_issue.fix_versions,
                warnings,
            );
            if as_set(&mapped) != as_set(&source_issue.fix_versions) {
                update.fields.fix_versions = Some(mapped);
            }
        }
    }

    Ok(update)
}

fn compute_target_diff(
    source: &dyn IssueTracker,
    target: &dyn IssueTracker,
    config: &ProjectSyncConfig,
    source_issue: &Issue,
    target_issue: &Issue,
    warnings: &mut Vec<String>,
) -> Result<IssueUpdate, SyncError> {
    let metadata = target.project_metadata(&config.target_project).map_err(|e| {
        SyncError::tracker(format!("fetching metadata of project {}", config.target_project), e)
    })?;

    let mut update = IssueUpdate::default();

    // Description: replace only the mirrored block, keep target-authored text.
    let wrapped = describe::wrap(
        &source_issue.key,
        &links::browse_url(source.base_url(), &source_issue.key),
        source_issue.description.as_deref().unwrap_or_default(),
    );
    let merged = describe::merge(target_issue.description.as_deref(), &wrapped);
    if target_issue.description.as_deref() != Some(merged.as_str()) {
        update.fields.description = Some(merged);
    }

    // Labels: source labels plus the kept target-only ones.
    let mut desired: BTreeSet<&str> = source_issue.labels.iter().map(String::as_str).collect();
    for label in &target_issue.labels {
        if config.keep_labels.iter().any(|keep| keep == label) {
            desired.insert(label);
        }
    }
    let current: BTreeSet<&str> = target_issue.labels.iter().map(String::as_str).collect();
    if desired != current {
        update.fields.labels = Some(desired.iter().map(ToString::to_string).collect());
    }

    // Priority must always be present in the target, so an unmappable
    // priority is fatal here, unlike everywhere else.
    let source_priority = source_issue.priority.as_deref().unwrap_or_default();
    let Some(mapped_priority) = mapper::map_value(
        ValueCategory::Priority,
        &config.mappings,
        &metadata,
        source_priority,
        warnings,
    ) else {
        return Err(SyncError::UnmappedPriority {
            issue: source_issue.key.clone(),
            priority: source_priority.to_string(),
            project: config.target_project.clone(),
        });
    };
    if target_issue.priority.as_deref() != Some(mapped_priority.as_str()) {
        update.fields.priority = Some(mapped_priority);
    }

    update.fields.versions = diff_version_set(
        config,
        &metadata,
        &source_issue.versions,
        &target_issue.versions,
        warnings,
    );
    update.fields.fix_versions = diff_version_set(
        config,
        &metadata,
        &source_issue.fix_versions,
        &target_issue.fix_versions,
        warnings,
    );

    Ok(update)
}

/// Maps a source version set and compares it to the target's current set.
/// Both sides empty is a no-op, skipped without consulting the tables.
fn diff_version_set(
    config: &ProjectSyncConfig,
    metadata: &ProjectMetadata,
    source_set: &[String],
    target_set: &[String],
    warnings: &mut Vec<String>,
) -> Option<Vec<String>> {
    if source_set.is_empty() && target_set.is_empty() {
        return None;
    }
    let mapped =
        mapper::map_set(ValueCategory::Version, &config.mappings, metadata, source_set, warnings);
    if as_set(&mapped) == as_set(target_set) {
        None
    } else {
        Some(mapped)
    }
}

fn as_set(values: &[String]) -> BTreeSet<&str> {
    values.iter().map(String::as_str).collect()
}

fn verify_backlink(
    source: &dyn IssueTracker,
    target: &dyn IssueTracker,
    source_issue: &Issue,
    target_issue: &Issue,
    warnings: &mut Vec<String>,
) -> Result<(), SyncError> {
    match links::resolve_counterpart(&target_issue.key, target, source)? {
        Some(back) if back.key == source_issue.key => Ok(()),
        Some(back) => Err(SyncError::BacklinkMismatch {
            target: target_issue.key.clone(),
            expected: source_issue.key.clone(),
            found: back.key,
        }),
        None => {
            // A prior run was interrupted after creating only one direction.
            target
                .add_link(
                    &target_issue.key,
                    &links::browse_url(source.base_url(), &source_issue.key),
                    &source_issue.key,
                )
                .map_err(|e| {
                    SyncError::tracker(
                        format!("linking {} to {}", target_issue.key, source_issue.key),
                        e,
                    )
                })?;
            warnings.push(format!(
                "recreated missing backlink from {} to {}",
                target_issue.key, source_issue.key
            ));
            Ok(())
        }
    }
}

fn apply(
    source: &dyn IssueTracker,
    target: &dyn IssueTracker,
    source_issue: &Issue,
    target_issue: &Issue,
    mut source_update: IssueUpdate,
    target_update: IssueUpdate,
    mut warnings: Vec<String>,
) -> Result<IssueOutcome, SyncError> {
    // The source-side channel exists only to carry transitions and their
    // bundled copy-back fields; a field-only source update is dropped.
    if source_update.transition.is_none() && !source_update.fields.is_empty() {
        warnings.push(format!(
            "dropping field-only source update for {}; no transition was staged",
            source_issue.key
        ));
        source_update.fields = FieldDelta::default();
    }

    let transitioned = match &source_update.transition {
        Some(transition) => {
            source
                .transition_issue(&source_issue.key, &transition.id, &source_update.fields)
                .map_err(|e| {
                    SyncError::tracker(
                        format!(
                            "transitioning {} to {}",
                            source_issue.key, transition.to_status
                        ),
                        e,
                    )
                })?;
            true
        }
        None => false,
    };

    let target_changed = if target_update.fields.is_empty() {
        false
    } else {
        target.update_issue(&target_issue.key, &target_update.fields).map_err(|e| {
            SyncError::tracker(format!("updating {}", target_issue.key), e)
        })?;
        true
    };

    let result = if transitioned {
        SyncResult::ChangedTransition
    } else if target_changed {
        SyncResult::Changed
    } else if warnings.is_empty() {
        SyncResult::Unchanged
    } else {
        SyncResult::UnchangedWarning
    };
    Ok(IssueOutcome { result, warnings })
}
