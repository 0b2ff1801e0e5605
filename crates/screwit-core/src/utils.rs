//! Pure helpers for session titles, capability options, timestamps and
//! validation.

use crate::error::ValidationError;
use chrono::{DateTime, Duration, Utc};
use screwit_types::{
    AgentOption, Capability, CapabilityFlags, NewSession, Session, MAX_TITLE_LEN,
};

/// Default maximum length of a derived title.
pub const DEFAULT_TITLE_MAX_LEN: usize = 50;

const ELLIPSIS: &str = "...";

/// Derive a session title from the first prompt.
///
/// Lengths are counted in characters. Long input is cut to `max_len - 3`
/// characters, backed off to the last space when that space sits past 70% of
/// `max_len`, and suffixed with an ellipsis.
pub fn derive_title(content: &str, max_len: usize) -> String {
    let clean = content.trim();

    if clean.chars().count() <= max_len {
        return clean.to_string();
    }

    let truncated: String = clean.chars().take(max_len.saturating_sub(3)).collect();
    let threshold = max_len as f64 * 0.7;

    let last_space = truncated
        .chars()
        .enumerate()
        .filter(|(_, c)| *c == ' ')
        .map(|(pos, _)| pos)
        .last();

    if let Some(pos) = last_space {
        if pos as f64 > threshold {
            let head: String = truncated.chars().take(pos).collect();
            return format!("{}{}", head, ELLIPSIS);
        }
    }

    format!("{}{}", truncated, ELLIPSIS)
}

/// Project an arbitrary option list onto the fixed capability record.
///
/// Unknown ids are ignored. For duplicates the last entry wins.
pub fn normalize_agent_options(options: &[AgentOption]) -> CapabilityFlags {
    let mut flags = CapabilityFlags::default();
    for option in options {
        if let Some(capability) = option.capability() {
            flags.set(capability, option.enabled);
        }
    }
    flags
}

/// Full option list for a stored flag record, in catalogue order.
pub fn options_from_flags(flags: &CapabilityFlags) -> Vec<AgentOption> {
    Capability::ALL
        .into_iter()
        .map(|cap| AgentOption::from_capability(cap, flags.get(cap)))
        .collect()
}

/// Options that are switched on.
pub fn enabled_options(options: &[AgentOption]) -> Vec<AgentOption> {
    options.iter().filter(|o| o.enabled).cloned().collect()
}

pub fn enabled_capability_count(flags: &CapabilityFlags) -> usize {
    flags.enabled().count()
}

/// Human-readable age of `instant` relative to `now`.
pub fn format_relative_time(instant: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(instant);
    let minutes = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        instant.format("%-m/%-d/%Y").to_string()
    }
}

/// Whether the session has been idle for longer than `stale_days`.
pub fn is_session_stale(session: &Session, stale_days: u32, now: DateTime<Utc>) -> bool {
    match now.checked_sub_signed(Duration::days(i64::from(stale_days))) {
        Some(stale_before) => session.last_activity < stale_before,
        None => false,
    }
}

pub fn is_session_owned_by_user(session: &Session, user_id: &str) -> bool {
    session.user_id == user_id
}

/// Check a session payload before it reaches the store.
pub fn validate_new_session(data: &NewSession) -> Result<(), ValidationError> {
    if data.title.trim().is_empty() {
        return Err(ValidationError::TitleRequired);
    }

    if data.title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong { max: MAX_TITLE_LEN });
    }

    if data.user_id.trim().is_empty() {
        return Err(ValidationError::UserIdRequired);
    }

    if data.agent_options.is_none() {
        return Err(ValidationError::AgentOptionsRequired);
    }

    Ok(())
}

/// Trim and collapse whitespace runs. Does not escape markup.
pub fn sanitize_content(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
