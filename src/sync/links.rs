//! Cross-system link resolution.
//!
//! The bidirectional browse links between a pair of issues are the engine's
//! only persisted idempotency marker. This module discovers a counterpart by
//! filtering an issue's outbound links against the other system's
//! `{base}/browse/{KEY}` pattern and resolving the extracted keys.

use crate::error::SyncError;
use crate::ports::{Issue, IssueTracker};

/// Builds the browse URL for an issue key on a tracker instance.
#[must_use]
pub fn browse_url(base_url: &str, key: &str) -> String {
    format!("{}/browse/{key}", base_url.trim_end_matches('/'))
}

/// Extracts an issue key from a URL matching `{base_url}/browse/{KEY}`.
///
/// Tolerant of duplicated path separators on either side; returns `None`
/// for URLs pointing anywhere else.
#[must_use]
pub fn parse_browse_key(base_url: &str, url: &str) -> Option<String> {
    let base = normalize(base_url);
    let url = normalize(url);
    let key = url.strip_prefix(&base)?.strip_prefix("/browse/")?;
    if key.is_empty() || key.contains('/') {
        return None;
    }
    Some(key.to_string())
}

/// Collapses duplicated slashes after the scheme and drops trailing ones.
fn normalize(url: &str) -> String {
    let (scheme, rest) = match url.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, url),
    };
    let mut out = String::with_capacity(url.len());
    if let Some(scheme) = scheme {
        out.push_str(scheme);
        out.push_str("://");
    }
    let mut previous_was_slash = false;
    for c in rest.chars() {
        if c == '/' {
            if previous_was_slash {
                continue;
            }
            previous_was_slash = true;
        } else {
            previous_was_slash = false;
        }
        out.push(c);
    }
    while out.ends_with('/') {
        out.pop();
    }
    out
}

/// Resolves the counterpart of `issue_key` by following its outbound links
/// into the other system.
///
/// `Ok(None)` means no counterpart exists yet; that is the signal to create
/// one, not an error.
///
/// # Errors
///
/// Returns [`SyncError::DanglingLink`] when every matching link points at a
/// key that no longer resolves, and [`SyncError::AmbiguousCounterpart`] when
/// the links resolve to more than one distinct issue.
pub fn resolve_counterpart(
    issue_key: &str,
    own: &dyn IssueTracker,
    other: &dyn IssueTracker,
) -> Result<Option<Issue>, SyncError> {
    let links = own
        .outbound_links(issue_key)
        .map_err(|e| SyncError::tracker(format!("listing links of {issue_key}"), e))?;

    let mut keys: Vec<String> = links
        .iter()
        .filter_map(|link| parse_browse_key(other.base_url(), &link.url))
        .collect();
    keys.sort();
    keys.dedup();

    if keys.is_empty() {
        return Ok(None);
    }

    let mut resolved: Vec<Issue> = Vec::new();
    for key in &keys {
        let fetched = other
            .fetch_issue(key)
            .map_err(|e| SyncError::tracker(format!("fetching counterpart {key}"), e))?;
        if let Some(issue) = fetched {
            resolved.push(issue);
        }
    }

    match resolved.len() {
        0 => Err(SyncError::DanglingLink { issue: issue_key.to_string(), key: keys.join(", ") }),
        1 => Ok(resolved.pop()),
        _ => Err(SyncError::AmbiguousCounterpart {
            issue: issue_key.to_string(),
            keys: resolved.iter().map(|issue| issue.key.as_str()).collect::<Vec<_>>().join(", "),
        }),
    }
}
