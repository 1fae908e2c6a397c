use chrono::{NaiveDate, Utc};
use validator::ValidateEmail;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Display names must carry at least 3 characters after trimming.
pub fn is_valid_full_name(name: &str) -> bool {
    name.trim().chars().count() >= 3
}

/// Password policy: at least 8 characters with at least one letter and
/// one digit. A stricter upper+lower+digit variant exists as an
/// alternative policy; only this one is enforced so that every entry
/// point applies the same rule.
pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Date of birth must fall within [1900-01-01, today].
pub fn is_valid_date_of_birth(dob: NaiveDate) -> bool {
    let floor = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
    let today = Utc::now().date_naive();
    dob >= floor && dob <= today
}
