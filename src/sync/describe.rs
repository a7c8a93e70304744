//! Mirrored-description wrapping and merging.
//!
//! A mirrored description is wrapped in a panel block titled with the source
//! issue, so readers of the target can tell mirrored text from text authored
//! in the target itself. Merging replaces only that block and preserves any
//! surrounding target-authored text.

const PANEL_HEADER_PREFIX: &str = "{panel:title=Synchronized from ";
const PANEL_FOOTER: &str = "{panel}";

/// Wraps a source description as a mirrored panel block.
#[must_use]
pub fn wrap(source_key: &str, source_url: &str, description: &str) -> String {
    format!("{PANEL_HEADER_PREFIX}[{source_key}|{source_url}]}}\n{description}\n{PANEL_FOOTER}")
}

/// Merges a freshly wrapped block into the target's current description.
///
/// Replaces the previously wrapped block when one exists; otherwise appends
/// the block below the target-authored text. Text outside the block is never
/// touched.
#[must_use]
pub fn merge(target_description: Option<&str>, wrapped: &str) -> String {
    let existing = match target_description {
        Some(text) if !text.trim().is_empty() => text,
        _ => return wrapped.to_string(),
    };

    let Some(start) = existing.find(PANEL_HEADER_PREFIX) else {
        return format!("{existing}\n\n{wrapped}");
    };

    // The header line ends in "]}" and never equals the bare footer, so the
    // first footer occurrence after `start` closes the mirrored block.
    let after_block = existing[start..]
        .find(PANEL_FOOTER)
        .map_or(existing.len(), |rel| start + rel + PANEL_FOOTER.len());

    format!("{}{wrapped}{}", &existing[..start], &existing[after_block..])
}
