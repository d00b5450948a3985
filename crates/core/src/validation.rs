//! Input validation for Slack identifiers and request payloads.
//!
//! Every function here is pure: it either hands back the validated value
//! unchanged or returns a [`ValidationError`] describing which field failed.
//! The newtype ids in [`crate::types::id`] call into these on construction,
//! so anything that made it into a typed id has already passed.

use thiserror::Error;

/// Minimum length of a request id.
pub const REQUEST_ID_MIN_LENGTH: usize = 3;
/// Maximum length of a request id.
pub const REQUEST_ID_MAX_LENGTH: usize = 50;

/// Fallback name used when a project name sanitizes to nothing.
const SANITIZED_FALLBACK: &str = "prosjekt";
/// Maximum length of a sanitized project name.
const SANITIZED_MAX_LENGTH: usize = 40;

/// A value failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: String,
    /// The rejected value, as received.
    pub value: String,
    /// Human-readable reason.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: &str, value: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            value: value.to_owned(),
            message: message.into(),
        }
    }
}

/// Validate a Slack user id (`U…`/`W…`, 9–11 alphanumerics).
///
/// # Errors
///
/// Returns [`ValidationError`] if the value is empty, has the wrong length,
/// or contains non-alphanumeric characters.
pub fn validate_user_id<'a>(value: &'a str, field: &str) -> Result<&'a str, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(field, value, "must be a non-empty string"));
    }

    if !(9..=11).contains(&value.len()) || !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ValidationError::new(
            field,
            value,
            "must be a valid Slack user ID format",
        ));
    }

    Ok(value)
}

/// Validate a Slack channel id (leading `C`, then 8–10 alphanumerics).
///
/// # Errors
///
/// Returns [`ValidationError`] if the value does not match the channel grammar.
pub fn validate_channel_id<'a>(value: &'a str, field: &str) -> Result<&'a str, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(field, value, "must be a non-empty string"));
    }

    let mut bytes = value.bytes();
    let leading_c = matches!(bytes.next(), Some(b'C' | b'c'));
    let rest_len = value.len() - 1;

    if !leading_c || !(8..=10).contains(&rest_len) || !bytes.all(|b| b.is_ascii_alphanumeric()) {
        return Err(ValidationError::new(
            field,
            value,
            "must be a valid Slack channel ID format",
        ));
    }

    Ok(value)
}

/// Validate a Slack message timestamp (`1712345678.123456`).
///
/// # Errors
///
/// Returns [`ValidationError`] unless the value is digits, a single dot, digits.
pub fn validate_message_ts<'a>(value: &'a str, field: &str) -> Result<&'a str, ValidationError> {
    let valid = value.split_once('.').is_some_and(|(secs, frac)| {
        !secs.is_empty()
            && !frac.is_empty()
            && secs.bytes().all(|b| b.is_ascii_digit())
            && frac.bytes().all(|b| b.is_ascii_digit())
    });

    if !valid {
        return Err(ValidationError::new(
            field,
            value,
            "must be a valid Slack message timestamp",
        ));
    }

    Ok(value)
}

/// Validate a request id length (3–50 characters).
///
/// # Errors
///
/// Returns [`ValidationError`] if the id is too short or too long.
pub fn validate_request_id<'a>(value: &'a str, field: &str) -> Result<&'a str, ValidationError> {
    let len = value.chars().count();
    if !(REQUEST_ID_MIN_LENGTH..=REQUEST_ID_MAX_LENGTH).contains(&len) {
        return Err(ValidationError::new(
            field,
            value,
            format!(
                "must be between {REQUEST_ID_MIN_LENGTH} and {REQUEST_ID_MAX_LENGTH} characters"
            ),
        ));
    }
    Ok(value)
}

/// Validate every user id in a list.
///
/// # Errors
///
/// Returns [`ValidationError`] naming the first invalid element
/// (`field[index]`), or the list itself when empty and `allow_empty` is false.
pub fn validate_user_ids<'a, S: AsRef<str>>(
    values: &'a [S],
    field: &str,
    allow_empty: bool,
) -> Result<&'a [S], ValidationError> {
    if !allow_empty && values.is_empty() {
        return Err(ValidationError::new(field, "[]", "cannot be empty"));
    }

    for (index, value) in values.iter().enumerate() {
        validate_user_id(value.as_ref(), &format!("{field}[{index}]"))?;
    }

    Ok(values)
}

/// Required-field checks on an incoming request payload.
///
/// # Errors
///
/// Returns [`ValidationError`] when the project name is blank, the requester
/// is not a valid user id, or any team member id is malformed.
pub fn validate_request_data(
    project_name: &str,
    requested_by: &str,
    team_members: &[impl AsRef<str>],
) -> Result<(), ValidationError> {
    if project_name.trim().is_empty() {
        return Err(ValidationError::new(
            "projectName",
            project_name,
            "is required and must be a non-empty string",
        ));
    }

    validate_user_id(requested_by, "requestedBy")?;
    validate_user_ids(team_members, "teamMembers", true)?;

    Ok(())
}

/// Turn a project name into something usable as a Slack channel name segment.
#[must_use]
pub fn sanitize_project_name(project_name: &str) -> String {
    let mut out = String::with_capacity(project_name.len());
    for c in project_name.to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            c
        } else {
            '-'
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }

    let trimmed: String = out
        .trim_matches('-')
        .chars()
        .take(SANITIZED_MAX_LENGTH)
        .collect();

    if trimmed.is_empty() {
        SANITIZED_FALLBACK.to_owned()
    } else {
        trimmed
    }
}
