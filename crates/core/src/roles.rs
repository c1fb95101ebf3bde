//! Well-known role name constants.
//!
//! These must match the `ck_users_role` check constraint in
//! `20261001000001_create_users_table.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_INSTRUCTOR: &str = "instructor";
pub const ROLE_STUDENT: &str = "student";

/// All valid role names.
pub const VALID_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_INSTRUCTOR, ROLE_STUDENT];

/// Whether the role may configure course content and release schedules.
pub fn can_manage_content(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_INSTRUCTOR
}

/// Validate a role name.
pub fn validate_role(role: &str) -> Result<(), String> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(format!(
            "Invalid role '{role}'. Must be one of: {}",
            VALID_ROLES.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructors_and_admins_manage_content() {
        assert!(can_manage_content(ROLE_ADMIN));
        assert!(can_manage_content(ROLE_INSTRUCTOR));
        assert!(!can_manage_content(ROLE_STUDENT));
    }

    #[test]
    fn unknown_role_rejected() {
        let err = validate_role("teacher").unwrap_err();
        assert!(err.contains("instructor"));
    }
}
