//! `tracksync check-config` command.

use std::path::Path;

use crate::config::SyncSettings;

/// Execute the `check-config` command: load, validate, summarize.
///
/// # Errors
///
/// Returns an error string when the file cannot be loaded or fails
/// validation.
pub fn run(config_path: &Path) -> Result<(), String> {
    let settings = SyncSettings::load(config_path).map_err(|e| e.to_string())?;

    println!("Config OK: {} project pair(s)", settings.projects.len());
    for project in &settings.projects {
        let tables = &project.mappings;
        println!(
            "  {} -> {}: filter {}, {} transition rule(s), {} mapping entries",
            project.source_project,
            project.target_project,
            project.source_filter,
            project.status_transitions.len(),
            tables.issue_types.len()
                + tables.priorities.len()
                + tables.resolutions.len()
                + tables.versions.len()
                + tables.components.len(),
        );
    }
    Ok(())
}
