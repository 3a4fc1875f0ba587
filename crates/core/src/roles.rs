//! Well-known role name constants.
//!
//! These must match the seed data in `20260301000001_create_roles.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_STAFF: &str = "staff";

/// Role name carried in tokens issued to external clients. Clients are not
/// rows in `users` and never appear in the `roles` table.
pub const ROLE_CLIENT: &str = "client";

/// Roles that may be assigned to a user account.
pub const USER_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_MANAGER, ROLE_STAFF];

/// Roles allowed to take supervisory decisions (approvals, rejections).
pub const SUPERVISORS: &[&str] = &[ROLE_ADMIN, ROLE_MANAGER];

/// Validate that a role name is assignable to a user.
pub fn validate_user_role(role: &str) -> Result<(), String> {
    if USER_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(format!(
            "Invalid role '{role}'. Must be one of: {}",
            USER_ROLES.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_roles_are_assignable() {
        for role in USER_ROLES {
            assert!(validate_user_role(role).is_ok());
        }
    }

    #[test]
    fn client_role_is_not_assignable_to_users() {
        let err = validate_user_role(ROLE_CLIENT).unwrap_err();
        assert!(err.contains("Invalid role"));
    }
}
