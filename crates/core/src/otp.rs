//! One-time verification codes.
//!
//! Codes are six zero-padded digits. Only a password-style hash of the code
//! is ever stored, together with an absolute expiry and a failed-attempt
//! counter. Hashing and verification use the same primitive as passwords and
//! live next to it in the API crate; this module owns generation and the
//! expiry / attempt bookkeeping.

use rand::Rng;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Number of digits in a code.
pub const OTP_LENGTH: usize = 6;

/// Lifetime of a freshly issued code.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Failed verification attempts after which the stored code is discarded.
pub const MAX_OTP_ATTEMPTS: i32 = 5;

/// Generate a uniformly random six-digit code.
pub fn generate_otp() -> String {
    let value: u32 = rand::rng().random_range(0..1_000_000);
    format!("{value:06}")
}

/// Absolute expiry for a code issued at `now`.
pub fn expiry_from(now: Timestamp) -> Timestamp {
    now + chrono::Duration::minutes(OTP_TTL_MINUTES)
}

/// Whether `code` has the shape of an issued code.
pub fn is_well_formed(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

/// Stored OTP state on an account row.
#[derive(Debug, Clone, Copy)]
pub struct StoredOtp<'a> {
    pub hash: Option<&'a str>,
    pub expires_at: Option<Timestamp>,
    pub attempts: i32,
}

/// Check that a stored code exists, is unexpired and still has attempts
/// left. Returns the stored hash to verify against.
///
/// Expiry is checked before the code value is ever compared, so an expired
/// code is rejected even when the submitted value matches.
pub fn usable_hash<'a>(stored: &StoredOtp<'a>, now: Timestamp) -> Result<&'a str, CoreError> {
    let (Some(hash), Some(expires_at)) = (stored.hash, stored.expires_at) else {
        return Err(CoreError::Validation(
            "No active verification code. Request a new one.".into(),
        ));
    };
    if now > expires_at {
        return Err(CoreError::Validation(
            "Verification code has expired. Request a new one.".into(),
        ));
    }
    if stored.attempts >= MAX_OTP_ATTEMPTS {
        return Err(CoreError::Validation(
            "Too many failed attempts. Request a new code.".into(),
        ));
    }
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_otp();
            assert!(is_well_formed(&code), "bad code {code}");
        }
    }

    #[test]
    fn malformed_codes_detected() {
        assert!(!is_well_formed("12345"));
        assert!(!is_well_formed("1234567"));
        assert!(!is_well_formed("12a456"));
        assert!(is_well_formed("000000"));
    }

    #[test]
    fn expiry_is_ten_minutes_out() {
        let now = Utc::now();
        assert_eq!(expiry_from(now) - now, chrono::Duration::minutes(10));
    }

    #[test]
    fn expired_code_rejected() {
        let now = Utc::now();
        let stored = StoredOtp {
            hash: Some("$argon2id$stub"),
            expires_at: Some(now - chrono::Duration::seconds(1)),
            attempts: 0,
        };
        assert_matches!(usable_hash(&stored, now), Err(CoreError::Validation(msg)) if msg.contains("expired"));
    }

    #[test]
    fn missing_code_rejected() {
        let stored = StoredOtp {
            hash: None,
            expires_at: None,
            attempts: 0,
        };
        assert!(usable_hash(&stored, Utc::now()).is_err());
    }

    #[test]
    fn exhausted_attempts_rejected() {
        let now = Utc::now();
        let stored = StoredOtp {
            hash: Some("h"),
            expires_at: Some(expiry_from(now)),
            attempts: MAX_OTP_ATTEMPTS,
        };
        assert_matches!(usable_hash(&stored, now), Err(CoreError::Validation(msg)) if msg.contains("Too many"));
    }

    #[test]
    fn live_code_returns_hash() {
        let now = Utc::now();
        let stored = StoredOtp {
            hash: Some("h"),
            expires_at: Some(expiry_from(now)),
            attempts: MAX_OTP_ATTEMPTS - 1,
        };
        assert_eq!(usable_hash(&stored, now).unwrap(), "h");
    }
}
