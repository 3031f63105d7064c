//! Submission validation.

use leaddesk_core::validate::is_valid_email;
use leaddesk_core::{Error, Result};

use crate::desk::NewConsultation;

/// Minimum length for project details after trimming.
pub const MIN_DETAILS_LENGTH: usize = 10;

// A repeated single character longer than this is treated as spam.
const MAX_REPEATED_RUN: usize = 10;

/// Validate a submission. Returns the first failing field; nothing is
/// persisted when this fails.
pub fn validate(input: &NewConsultation) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(Error::validation("name", "name is required"));
    }
    if !is_valid_email(input.email.trim()) {
        return Err(Error::validation("email", "not a valid email address"));
    }
    if input.project_type.trim().is_empty() {
        return Err(Error::validation("project_type", "project type is required"));
    }
    if input.budget.trim().is_empty() {
        return Err(Error::validation("budget", "budget is required"));
    }

    let details = input.project_details.trim();
    if details.is_empty() {
        return Err(Error::validation(
            "project_details",
            "project details are required",
        ));
    }
    if details.chars().count() < MIN_DETAILS_LENGTH {
        return Err(Error::validation(
            "project_details",
            format!("please describe the project in at least {MIN_DETAILS_LENGTH} characters"),
        ));
    }
    if looks_like_spam(details) {
        return Err(Error::validation(
            "project_details",
            "project details look like filler text",
        ));
    }
    Ok(())
}

// Crude spam filter: one character repeated past the run limit.
fn looks_like_spam(details: &str) -> bool {
    let mut chars = details.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    details.chars().count() > MAX_REPEATED_RUN && chars.all(|c| c == first)
}
