//! Field/value mapping between the two trackers' vocabularies.
//!
//! Pure name-to-name translation driven by the declarative tables in
//! [`FieldMappings`], validated against the destination project's live
//! vocabulary. A miss is a soft condition: the caller gets `None` plus an
//! accumulated warning and omits the field, it is never defaulted silently.

use crate::config::{FieldMappings, ValueCategory};
use crate::ports::ProjectMetadata;

/// Maps one value from the table's declared direction (source→target).
///
/// Returns `None` with an accumulated warning when the table has no entry or
/// when the mapped name is not part of the destination's live vocabulary.
#[must_use]
pub fn map_value(
    category: ValueCategory,
    mappings: &FieldMappings,
    destination: &ProjectMetadata,
    raw: &str,
    warnings: &mut Vec<String>,
) -> Option<String> {
    let Some(mapped) = mappings.table(category).get(raw) else {
        warnings.push(format!(
            "{category} \"{raw}\" has no mapping entry; field omitted"
        ));
        return None;
    };
    validated(category, destination, mapped.clone(), warnings)
}

/// Maps one value against the table's declared direction (target→source).
///
/// Performs a reverse lookup (value→name). Serves the copy-back of
/// resolutions and fix-versions into the source vocabulary.
#[must_use]
pub fn map_value_reverse(
    category: ValueCategory,
    mappings: &FieldMappings,
    destination: &ProjectMetadata,
    raw: &str,
    warnings: &mut Vec<String>,
) -> Option<String> {
    let table = mappings.table(category);
    let mut hits = table.iter().filter(|(_, mapped)| mapped.as_str() == raw);
    let Some((name, _)) = hits.next() else {
        warnings.push(format!(
            "{category} \"{raw}\" has no reverse mapping entry; field omitted"
        ));
        return None;
    };
    if hits.next().is_some() {
        warnings.push(format!(
            "{category} \"{raw}\" reverse-maps to multiple names; field omitted"
        ));
        return None;
    }
    validated(category, destination, name.clone(), warnings)
}

/// Maps a value set, dropping misses individually.
#[must_use]
pub fn map_set(
    category: ValueCategory,
    mappings: &FieldMappings,
    destination: &ProjectMetadata,
    raw: &[String],
    warnings: &mut Vec<String>,
) -> Vec<String> {
    raw.iter()
        .filter_map(|value| map_value(category, mappings, destination, value, warnings))
        .collect()
}

/// Reverse-maps a value set, dropping misses individually.
#[must_use]
pub fn map_set_reverse(
    category: ValueCategory,
    mappings: &FieldMappings,
    destination: &ProjectMetadata,
    raw: &[String],
    warnings: &mut Vec<String>,
) -> Vec<String> {
    raw.iter()
        .filter_map(|value| map_value_reverse(category, mappings, destination, value, warnings))
        .collect()
}

fn validated(
    category: ValueCategory,
    destination: &ProjectMetadata,
    mapped: String,
    warnings: &mut Vec<String>,
) -> Option<String> {
    if destination.allowed(category).iter().any(|allowed| *allowed == mapped) {
        Some(mapped)
    } else {
        warnings.push(format!(
            "mapped {category} \"{mapped}\" is not valid in project {}; field omitted",
            destination.key
        ));
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn mappings() -> FieldMappings {
        FieldMappings {
            priorities: BTreeMap::from([
                ("High".to_string(), "Urgent".to_string()),
                ("Low".to_string(), "Minor".to_string()),
            ]),
            resolutions: BTreeMap::from([
                ("Fixed".to_string(), "Done".to_string()),
                ("Duplicate".to_string(), "Done".to_string()),
            ]),
            ..FieldMappings::default()
        }
    }

    fn metadata() -> ProjectMetadata {
        ProjectMetadata {
            key: "PRJ_ONE".to_string(),
            priorities: vec!["Urgent".to_string(), "Minor".to_string()],
            resolutions: vec!["Fixed".to_string(), "Done".to_string()],
            ..ProjectMetadata::default()
        }
    }

    #[test]
    fn maps_value_through_table() {
        let mut warnings = Vec::new();
        let mapped =
            map_value(ValueCategory::Priority, &mappings(), &metadata(), "High", &mut warnings);
        assert_eq!(mapped.as_deref(), Some("Urgent"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn table_miss_warns_and_omits() {
        let mut warnings = Vec::new();
        let mapped =
            map_value(ValueCategory::Priority, &mappings(), &metadata(), "Blocker", &mut warnings);
        assert_eq!(mapped, None);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("no mapping entry"));
    }

    #[test]
    fn mapped_value_outside_live_vocabulary_warns_and_omits() {
        let mut table = mappings();
        table.priorities.insert("Blocker".to_string(), "Showstopper".to_string());
        let mut warnings = Vec::new();
        let mapped =
            map_value(ValueCategory::Priority, &table, &metadata(), "Blocker", &mut warnings);
        assert_eq!(mapped, None);
        assert!(warnings[0].contains("not valid in project PRJ_ONE"));
    }

    fn source_metadata() -> ProjectMetadata {
        ProjectMetadata {
            key: "PROJECT_ONE".to_string(),
            priorities: vec!["High".to_string(), "Low".to_string()],
            resolutions: vec!["Fixed".to_string(), "Duplicate".to_string()],
            ..ProjectMetadata::default()
        }
    }

    #[test]
    fn reverse_lookup_finds_unique_name() {
        let mut warnings = Vec::new();
        let mapped = map_value_reverse(
            ValueCategory::Priority,
            &mappings(),
            &source_metadata(),
            "Minor",
            &mut warnings,
        );
        // Reverse of Low -> Minor, validated against the source vocabulary.
        assert_eq!(mapped.as_deref(), Some("Low"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn ambiguous_reverse_lookup_omits() {
        let mut warnings = Vec::new();
        let mapped = map_value_reverse(
            ValueCategory::Resolution,
            &mappings(),
            &source_metadata(),
            "Done",
            &mut warnings,
        );
        assert_eq!(mapped, None);
        assert!(warnings[0].contains("multiple names"));
    }

    #[test]
    fn map_set_drops_misses_individually() {
        let mut warnings = Vec::new();
        let mapped = map_set(
            ValueCategory::Priority,
            &mappings(),
            &metadata(),
            &["High".to_string(), "Blocker".to_string(), "Low".to_string()],
            &mut warnings,
        );
        assert_eq!(mapped, vec!["Urgent".to_string(), "Minor".to_string()]);
        assert_eq!(warnings.len(), 1);
    }
}
