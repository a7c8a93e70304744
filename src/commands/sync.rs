//! `tracksync sync` command.

use std::path::Path;
use std::time::Duration;

use crate::adapters::{JiraTracker, TtlCache};
use crate::config::{ProjectSyncConfig, SyncSettings, TrackerSettings};
use crate::sync::SyncEngine;

/// How long cached project vocabulary responses stay fresh.
const METADATA_TTL: Duration = Duration::from_secs(300);

/// Execute the `sync` command.
///
/// # Errors
///
/// Returns an error string when the configuration cannot be loaded, a
/// tracker token is missing from the environment, `only_project` names an
/// unconfigured pair, or the run hits a fatal sync error.
pub fn run(config_path: &Path, only_project: Option<&str>) -> Result<(), String> {
    let settings = SyncSettings::load(config_path).map_err(|e| e.to_string())?;

    let projects = selected_projects(&settings.projects, only_project)?;
    let source = build_tracker(&settings.source)?;
    let target = build_tracker(&settings.target)?;

    let engine = SyncEngine::new(&source, &target);
    let report = engine.run(&projects).map_err(|e| e.to_string())?;
    println!("Sync complete:");
    print!("{}", report.format());
    Ok(())
}

fn selected_projects(
    configured: &[ProjectSyncConfig],
    only_project: Option<&str>,
) -> Result<Vec<ProjectSyncConfig>, String> {
    match only_project {
        None => Ok(configured.to_vec()),
        Some(key) => {
            let selected: Vec<ProjectSyncConfig> =
                configured.iter().filter(|p| p.source_project == key).cloned().collect();
            if selected.is_empty() {
                return Err(format!("no configured project pair has source project {key}"));
            }
            Ok(selected)
        }
    }
}

fn build_tracker(settings: &TrackerSettings) -> Result<JiraTracker, String> {
    let token = std::env::var(&settings.token_env)
        .map_err(|_| format!("environment variable {} is not set", settings.token_env))?;
    Ok(JiraTracker::new(settings, token, Box::new(TtlCache::new(METADATA_TTL))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldMappings;

    fn pair(source: &str) -> ProjectSyncConfig {
        ProjectSyncConfig {
            source_project: source.to_string(),
            target_project: "PRJ".to_string(),
            source_filter: "1".to_string(),
            fallback_issue_type: "Task".to_string(),
            keep_labels: vec![],
            status_transitions: vec![],
            mappings: FieldMappings::default(),
        }
    }

    #[test]
    fn selects_all_pairs_by_default() {
        let configured = vec![pair("A"), pair("B")];
        let selected = selected_projects(&configured, None).unwrap();
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn restricts_to_named_source_project() {
        let configured = vec![pair("A"), pair("B")];
        let selected = selected_projects(&configured, Some("B")).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].source_project, "B");
    }

    #[test]
    fn unknown_project_restriction_errors() {
        let configured = vec![pair("A")];
        let err = selected_projects(&configured, Some("MISSING")).unwrap_err();
        assert!(err.contains("MISSING"));
    }

    #[test]
    fn run_reports_missing_config_file() {
        let result = run(Path::new("/nonexistent/sync.yaml"), None);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("failed to load config"));
    }
}
