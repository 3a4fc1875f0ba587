//! Generated credentials for accounts created without a password.

use rand::Rng;

/// Length of auto-generated passwords.
pub const GENERATED_PASSWORD_LENGTH: usize = 16;

/// Generate a random alphanumeric password. The plaintext is emailed to the
/// account holder once and never stored.
pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(GENERATED_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_password_shape() {
        let pw = generate_password();
        assert_eq!(pw.len(), GENERATED_PASSWORD_LENGTH);
        assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_passwords_differ() {
        assert_ne!(generate_password(), generate_password());
    }
}
