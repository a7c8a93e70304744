//! Status-transition rule matching.
//!
//! A stateless predicate evaluated fresh on every pass over the current
//! (source status, target status) pair. Ambiguity is a configuration error
//! detected at match time and never resolved by rule order.

use crate::config::StatusTransitionRule;
use crate::error::SyncError;
use crate::ports::Transition;

/// Evaluates a project's rule list against the current status pair.
///
/// Returns the single matching rule, or `None` when no rule matches (the
/// common case).
///
/// # Errors
///
/// Returns [`SyncError::AmbiguousRule`] when more than one rule survives the
/// filter.
pub fn match_rule<'a>(
    issue_key: &str,
    rules: &'a [StatusTransitionRule],
    source_status: &str,
    target_status: &str,
    target_assigned: bool,
) -> Result<Option<&'a StatusTransitionRule>, SyncError> {
    let mut survivors = rules.iter().filter(|rule| {
        rule.source_status_in.iter().any(|s| s == source_status)
            && rule.target_status_in.iter().any(|s| s == target_status)
            && (!rule.only_if_assigned_in_target || target_assigned)
    });

    let Some(first) = survivors.next() else {
        return Ok(None);
    };
    let extra = survivors.count();
    if extra > 0 {
        return Err(SyncError::AmbiguousRule {
            issue: issue_key.to_string(),
            source_status: source_status.to_string(),
            target_status: target_status.to_string(),
            count: extra + 1,
        });
    }
    Ok(Some(first))
}

/// Looks up the concrete workflow transition a fired rule requires.
///
/// Matched by destination status name among the transitions the workflow
/// currently offers for the issue.
///
/// # Errors
///
/// Returns [`SyncError::TransitionUnavailable`] unless exactly one available
/// transition leads to `to_status`.
pub fn select_transition(
    issue_key: &str,
    available: &[Transition],
    to_status: &str,
) -> Result<Transition, SyncError> {
    let mut candidates = available.iter().filter(|t| t.to_status == to_status);
    let first = candidates.next();
    let extra = candidates.count();
    match (first, extra) {
        (Some(transition), 0) => Ok(transition.clone()),
        (first, extra) => Err(SyncError::TransitionUnavailable {
            issue: issue_key.to_string(),
            to_status: to_status.to_string(),
            count: usize::from(first.is_some()) + extra,
        }),
    }
}
