//! Declarative sync configuration loaded from YAML.
//!
//! All mapping and transition decisions the engine makes are driven by the
//! plain value structs in this module. They are constructed once per run and
//! passed explicitly down the call chain; there is no ambient configuration
//! lookup.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Connection settings for one tracker instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// Base URL of the tracker, e.g. `https://jira-source`.
    pub base_url: String,
    /// User name for basic authentication.
    pub user: String,
    /// Name of the environment variable holding the API token.
    pub token_env: String,
}

/// Value category a mapping table translates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCategory {
    /// Issue type names.
    IssueType,
    /// Priority names.
    Priority,
    /// Resolution names.
    Resolution,
    /// Version names (also covers fix-versions).
    Version,
    /// Component names.
    Component,
}

impl fmt::Display for ValueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::IssueType => "issue type",
            Self::Priority => "priority",
            Self::Resolution => "resolution",
            Self::Version => "version",
            Self::Component => "component",
        };
        f.write_str(name)
    }
}

/// Per-category name-to-name translation tables, declared source→target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldMappings {
    /// Issue type table.
    #[serde(default)]
    pub issue_types: BTreeMap<String, String>,
    /// Priority table.
    #[serde(default)]
    pub priorities: BTreeMap<String, String>,
    /// Resolution table.
    #[serde(default)]
    pub resolutions: BTreeMap<String, String>,
    /// Version table, shared by versions and fix-versions.
    #[serde(default)]
    pub versions: BTreeMap<String, String>,
    /// Component table.
    #[serde(default)]
    pub components: BTreeMap<String, String>,
}

impl FieldMappings {
    /// Returns the table for one value category.
    #[must_use]
    pub fn table(&self, category: ValueCategory) -> &BTreeMap<String, String> {
        match category {
            ValueCategory::IssueType => &self.issue_types,
            ValueCategory::Priority => &self.priorities,
            ValueCategory::Resolution => &self.resolutions,
            ValueCategory::Version => &self.versions,
            ValueCategory::Component => &self.components,
        }
    }
}

/// One declarative status-transition rule.
///
/// A rule correlates a (source status, target status) pair with a required
/// source-side workflow transition. For any pair seen during a pass, at most
/// one rule of a project may match; ambiguity is detected at match time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransitionRule {
    /// Source statuses this rule accepts.
    pub source_status_in: Vec<String>,
    /// Target statuses this rule accepts.
    pub target_status_in: Vec<String>,
    /// Source status to transition to when the rule fires.
    pub transition_source_to: String,
    /// Only fire when the target issue currently has an assignee.
    #[serde(default)]
    pub only_if_assigned_in_target: bool,
    /// Assign the source issue to the syncing identity before transitioning.
    #[serde(default)]
    pub assign_to_myself_in_source: bool,
    /// Copy the target's resolution into the source alongside the transition.
    #[serde(default)]
    pub copy_resolution_to_source: bool,
    /// Copy the target's fix-versions into the source alongside the transition.
    #[serde(default)]
    pub copy_fix_versions_to_source: bool,
}

/// One source/target project pair with its rules and mapping tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSyncConfig {
    /// Source project key.
    pub source_project: String,
    /// Target project key.
    pub target_project: String,
    /// Identifier of the saved source-side filter producing candidate issues.
    pub source_filter: String,
    /// Issue type used in the target when the source type has no mapping.
    pub fallback_issue_type: String,
    /// Target-only labels exempt from overwrite.
    #[serde(default)]
    pub keep_labels: Vec<String>,
    /// Status-transition rule list.
    #[serde(default)]
    pub status_transitions: Vec<StatusTransitionRule>,
    /// Value-mapping tables.
    #[serde(default)]
    pub mappings: FieldMappings,
}

/// Complete configuration for one run: both trackers and all project pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Connection settings for the source tracker.
    pub source: TrackerSettings,
    /// Connection settings for the target tracker.
    pub target: TrackerSettings,
    /// Project pairs to synchronize, processed in order.
    pub projects: Vec<ProjectSyncConfig>,
}

impl SyncSettings {
    /// Loads and validates settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConfigLoad`] when the file cannot be read or
    /// parsed, and [`SyncError::ConfigInvalid`] when shape-level validation
    /// fails.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::ConfigLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let settings: Self =
            serde_yaml::from_str(&content).map_err(|e| SyncError::ConfigLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates shape-level invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConfigInvalid`] naming the first violation found.
    pub fn validate(&self) -> Result<(), SyncError> {
        let mut seen_pairs = Vec::new();
        for project in &self.projects {
            if project.source_project.is_empty() || project.target_project.is_empty() {
                return Err(SyncError::ConfigInvalid(
                    "project pair with empty project key".to_string(),
                ));
            }
            if project.fallback_issue_type.is_empty() {
                return Err(SyncError::ConfigInvalid(format!(
                    "pair {} -> {}: fallback_issue_type must not be empty",
                    project.source_project, project.target_project
                )));
            }
            let pair = (project.source_project.clone(), project.target_project.clone());
            if seen_pairs.contains(&pair) {
                return Err(SyncError::ConfigInvalid(format!(
                    "duplicate project pair {} -> {}",
                    pair.0, pair.1
                )));
            }
            seen_pairs.push(pair);

            for rule in &project.status_transitions {
                if rule.source_status_in.is_empty() || rule.target_status_in.is_empty() {
                    return Err(SyncError::ConfigInvalid(format!(
                        "pair {} -> {}: transition rule with empty status set",
                        project.source_project, project.target_project
                    )));
                }
                if rule.transition_source_to.is_empty() {
                    return Err(SyncError::ConfigInvalid(format!(
                        "pair {} -> {}: transition rule without a destination status",
                        project.source_project, project.target_project
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
source:
  base_url: https://jira-source
  user: syncbot
  token_env: SOURCE_TOKEN
target:
  base_url: https://jira-target
  user: syncbot
  token_env: TARGET_TOKEN
projects:
  - source_project: PROJECT_ONE
    target_project: PRJ_ONE
    source_filter: "10200"
    fallback_issue_type: Task
    keep_labels: [internal-label]
    status_transitions:
      - source_status_in: [Open]
        target_status_in: [Closed]
        transition_source_to: Resolved
        copy_resolution_to_source: true
    mappings:
      issue_types:
        Bug: Defect
      priorities:
        High: Urgent
"#;

    fn parsed() -> SyncSettings {
        serde_yaml::from_str(SAMPLE).expect("sample config parses")
    }

    #[test]
    fn parses_sample_config() {
        let settings = parsed();
        assert_eq!(settings.projects.len(), 1);
        let project = &settings.projects[0];
        assert_eq!(project.source_filter, "10200");
        assert_eq!(project.keep_labels, vec!["internal-label".to_string()]);
        assert_eq!(project.mappings.issue_types.get("Bug").map(String::as_str), Some("Defect"));
    }

    #[test]
    fn rule_predicates_default_to_false() {
        let settings = parsed();
        let rule = &settings.projects[0].status_transitions[0];
        assert!(rule.copy_resolution_to_source);
        assert!(!rule.only_if_assigned_in_target);
        assert!(!rule.assign_to_myself_in_source);
        assert!(!rule.copy_fix_versions_to_source);
    }

    #[test]
    fn validate_accepts_sample() {
        assert!(parsed().validate().is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_pair() {
        let mut settings = parsed();
        let duplicate = settings.projects[0].clone();
        settings.projects.push(duplicate);
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate project pair"));
    }

    #[test]
    fn validate_rejects_empty_status_set() {
        let mut settings = parsed();
        settings.projects[0].status_transitions[0].target_status_in.clear();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("empty status set"));
    }

    #[test]
    fn load_reads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE.as_bytes()).expect("write sample");
        let settings = SyncSettings::load(file.path()).expect("load succeeds");
        assert_eq!(settings.source.token_env, "SOURCE_TOKEN");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SyncSettings::load(Path::new("/nonexistent/sync.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to load config"));
    }

    #[test]
    fn table_selects_category() {
        let settings = parsed();
        let mappings = &settings.projects[0].mappings;
        assert_eq!(
            mappings.table(ValueCategory::Priority).get("High").map(String::as_str),
            Some("Urgent")
        );
        assert!(mappings.table(ValueCategory::Resolution).is_empty());
    }
}
