use crate::error::{IdentityError, Result};
use crate::security::hash_password;

/// User record owned by the Credential Store
///
/// Only the role may change after provisioning.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub role: String,
}

impl User {
    /// Provision a user, hashing the plaintext password.
    pub fn new(username: impl Into<String>, password: &str, role: impl Into<String>) -> Result<Self> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(IdentityError::InvalidUsername("username is empty".into()));
        }

        Ok(Self {
            username,
            password_hash: hash_password(password)?,
            role: role.into(),
        })
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Plaintext user definition used to seed a store at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct UserSeed {
    pub username: String,
    pub password: String,
    pub role: String,
}

impl UserSeed {
    /// Parse `user:password:role` entries separated by commas.
    ///
    /// Passwords may not contain `:` or `,`.
    pub fn parse_list(spec: &str) -> Result<Vec<Self>> {
        spec.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let mut parts = entry.splitn(3, ':');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(user), Some(password), Some(role))
                        if !user.is_empty() && !password.is_empty() && !role.is_empty() =>
                    {
                        Ok(Self {
                            username: user.to_string(),
                            password: password.to_string(),
                            role: role.to_string(),
                        })
                    }
                    _ => {
                        let user = entry.split(':').next().unwrap_or_default();
                        Err(IdentityError::InvalidUserSeed(format!(
                            "expected user:password:role for {:?}",
                            user
                        )))
                    }
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for UserSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSeed")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_list() {
        let seeds = UserSeed::parse_list("admin:correctpw:admin, viewer:pw2:guest").unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].username, "admin");
        assert_eq!(seeds[0].password, "correctpw");
        assert_eq!(seeds[1].role, "guest");
    }

    #[test]
    fn test_parse_rejects_missing_role_without_echoing_password() {
        let err = UserSeed::parse_list("admin:secretpw").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("admin"));
        assert!(!msg.contains("secretpw"));
    }

    #[test]
    fn test_empty_list() {
        assert!(UserSeed::parse_list("").unwrap().is_empty());
    }

    #[test]
    fn test_user_debug_hides_hash() {
        let user = User::new("admin", "correctpw", "admin").unwrap();
        assert!(!format!("{user:?}").contains("argon2"));
        assert!(User::new("  ", "pw", "admin").is_err());
    }
}
