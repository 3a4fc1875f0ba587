//! Input validation helpers shared by request DTOs.
//!
//! DTOs derive [`validator::Validate`] for the declarative checks (email
//! shape, lengths); [`validate`] turns the resulting error map into a single
//! readable [`CoreError::Validation`]. Checks that `validator` does not cover
//! are plain functions below.

use validator::{Validate, ValidationErrors};

use crate::error::CoreError;

/// Run derived validations and flatten failures into one message.
pub fn validate<T: Validate>(value: &T) -> Result<(), CoreError> {
    value
        .validate()
        .map_err(|errors| CoreError::Validation(flatten(&errors)))
}

/// Render `ValidationErrors` as `field: message; field: message`, sorted by
/// field name.
pub fn flatten(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let detail = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid ({})", e.code))
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{field}: {detail}")
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

/// Accept an optional leading `+` followed by 1-15 digits (the E.164 upper
/// bound). Spaces and dashes are allowed as separators.
pub fn validate_phone(phone: &str) -> Result<(), CoreError> {
    let trimmed = phone.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let mut count = 0;
    for c in digits.chars() {
        match c {
            '0'..='9' => count += 1,
            ' ' | '-' => {}
            _ => {
                return Err(CoreError::Validation(format!(
                    "phoneNumber: '{phone}' contains invalid characters"
                )))
            }
        }
    }
    if !(1..=15).contains(&count) {
        return Err(CoreError::Validation(format!(
            "phoneNumber: '{phone}' must contain 1 to 15 digits"
        )));
    }
    Ok(())
}

/// Reject empty or whitespace-only required text.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        Err(CoreError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn validate_password(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use validator::Validate;

    use super::*;

    #[derive(Validate)]
    struct Signup {
        #[validate(email(message = "must be a valid email"))]
        email: String,
        #[validate(length(min = 1, message = "is required"))]
        first_name: String,
    }

    #[test]
    fn flattened_errors_are_sorted_by_field() {
        let input = Signup {
            email: "nope".into(),
            first_name: String::new(),
        };
        let err = validate(&input).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg)
            if msg == "email: must be a valid email; first_name: is required");
    }

    #[test]
    fn valid_input_passes() {
        let input = Signup {
            email: "a@example.com".into(),
            first_name: "Ann".into(),
        };
        assert!(validate(&input).is_ok());
    }

    #[test]
    fn phone_numbers() {
        assert!(validate_phone("+44 20 7946 0958").is_ok());
        assert!(validate_phone("555-0100").is_ok());
        assert!(validate_phone("+1").is_ok());
        assert!(validate_phone("+").is_err());
        assert!(validate_phone("  ").is_err());
        assert!(validate_phone("+1 (555) 0100").is_err());
        assert!(validate_phone("1234567890123456").is_err());
    }

    #[test]
    fn blank_required_text_rejected() {
        assert!(require_non_empty("title", "  ").is_err());
        assert!(require_non_empty("title", "Roof").is_ok());
    }

    #[test]
    fn short_password_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
