//! Synchronization decision engine.
//!
//! Resolves counterparts, decides create-vs-update, computes minimal field
//! diffs, evaluates status-transition rules and maintains the bidirectional
//! cross-reference links. Idempotent: re-running with no external changes
//! produces no further mutations.

pub mod create;
pub mod describe;
pub mod links;
pub mod mapper;
pub mod orchestrator;
pub mod transitions;
pub mod update;

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::ports::{FieldDelta, Transition};

pub use orchestrator::SyncEngine;

/// Outcome tag for one processed source issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SyncResult {
    /// A counterpart was created in the target.
    Created,
    /// Both sides already converged; nothing was written.
    Unchanged,
    /// Nothing was written, but the pass produced warnings.
    UnchangedWarning,
    /// At least one field update was applied.
    Changed,
    /// A workflow transition was applied; takes reporting precedence over a
    /// simultaneous field change.
    ChangedTransition,
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Created => "CREATED",
            Self::Unchanged => "UNCHANGED",
            Self::UnchangedWarning => "UNCHANGED_WARNING",
            Self::Changed => "CHANGED",
            Self::ChangedTransition => "CHANGED_TRANSITION",
        };
        f.write_str(tag)
    }
}

/// Pending mutations against one side of a pair.
///
/// Empty means no-op. A staged transition is the only way a status changes;
/// direct status overwrites do not exist in this model.
#[derive(Debug, Clone, Default)]
pub struct IssueUpdate {
    /// Field values to write.
    pub fields: FieldDelta,
    /// Workflow transition to apply, if any.
    pub transition: Option<Transition>,
}

impl IssueUpdate {
    /// Returns `true` when applying this update would do nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.transition.is_none()
    }
}

/// Result of one strategy pass over a single issue.
#[derive(Debug)]
pub struct IssueOutcome {
    /// Outcome tag for tallying.
    pub result: SyncResult,
    /// Soft conditions encountered; the pass still succeeded.
    pub warnings: Vec<String>,
}

impl IssueOutcome {
    /// An outcome with no warnings.
    #[must_use]
    pub fn clean(result: SyncResult) -> Self {
        Self { result, warnings: Vec::new() }
    }
}

/// Tally of outcomes for one project pair.
#[derive(Debug)]
pub struct ProjectReport {
    /// Source project key.
    pub source_project: String,
    /// Target project key.
    pub target_project: String,
    /// Count per outcome tag.
    pub counts: BTreeMap<SyncResult, usize>,
}

impl ProjectReport {
    /// Creates an empty tally for a pair.
    #[must_use]
    pub fn new(source_project: &str, target_project: &str) -> Self {
        Self {
            source_project: source_project.to_string(),
            target_project: target_project.to_string(),
            counts: BTreeMap::new(),
        }
    }

    /// Records one outcome.
    pub fn record(&mut self, result: SyncResult) {
        *self.counts.entry(result).or_insert(0) += 1;
    }

    /// Total number of processed issues.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Count recorded for one outcome tag.
    #[must_use]
    pub fn count(&self, result: SyncResult) -> usize {
        self.counts.get(&result).copied().unwrap_or(0)
    }
}

/// Tally of a whole run across all project pairs.
#[derive(Debug)]
pub struct RunReport {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// One report per processed project pair, in configuration order.
    pub projects: Vec<ProjectReport>,
}

impl RunReport {
    /// Creates an empty report stamped with the run start time.
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self { started_at, projects: Vec::new() }
    }

    /// Formats the per-project tallies as a human-readable summary.
    #[must_use]
    pub fn format(&self) -> String {
        if self.projects.is_empty() {
            return "No project pairs configured.".to_string();
        }
        let mut out = String::new();
        for project in &self.projects {
            let _ = write!(
                out,
                "{} -> {}: {} issues",
                project.source_project,
                project.target_project,
                project.total()
            );
            for result in [
                SyncResult::Created,
                SyncResult::Changed,
                SyncResult::ChangedTransition,
                SyncResult::Unchanged,
                SyncResult::UnchangedWarning,
            ] {
                let count = project.count(result);
                if count > 0 {
                    let _ = write!(out, "  {result} {count}");
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_is_noop() {
        assert!(IssueUpdate::default().is_empty());
        let update = IssueUpdate {
            transition: Some(Transition {
                id: "5".to_string(),
                name: "Resolve".to_string(),
                to_status: "Resolved".to_string(),
            }),
            ..IssueUpdate::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn report_tallies_per_result() {
        let mut report = ProjectReport::new("PROJECT_ONE", "PRJ_ONE");
        report.record(SyncResult::Created);
        report.record(SyncResult::Unchanged);
        report.record(SyncResult::Unchanged);
        assert_eq!(report.total(), 3);
        assert_eq!(report.count(SyncResult::Unchanged), 2);
        assert_eq!(report.count(SyncResult::Changed), 0);
    }

    #[test]
    fn format_lists_only_nonzero_counts() {
        let mut run = RunReport::new(Utc::now());
        let mut report = ProjectReport::new("PROJECT_ONE", "PRJ_ONE");
        report.record(SyncResult::Created);
        report.record(SyncResult::ChangedTransition);
        run.projects.push(report);
        let text = run.format();
        assert!(text.contains("PROJECT_ONE -> PRJ_ONE: 2 issues"));
        assert!(text.contains("CREATED 1"));
        assert!(text.contains("CHANGED_TRANSITION 1"));
        assert!(!text.contains("UNCHANGED"));
    }

    #[test]
    fn format_without_projects() {
        let run = RunReport::new(Utc::now());
        assert_eq!(run.format(), "No project pairs configured.");
    }
}
