//! Authentication primitives.
//!
//! - [`password`] -- Argon2id hashing for passwords and one-time codes.
//! - [`jwt`] -- access-token generation and validation.

pub mod jwt;
pub mod password;
