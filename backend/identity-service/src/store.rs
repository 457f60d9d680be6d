//! Credential Store
//!
//! Usernames, salted password hashes and role assignments. The trait is the
//! seam for a real user database; the in-memory store backs the gateway.

use crate::error::{IdentityError, Result};
use crate::models::{User, UserSeed};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Insert a new user. Fails if the username is taken.
    async fn save(&self, user: User) -> Result<()>;

    async fn assign_role(&self, username: &str, role: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<String, User>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash and insert every seed. Duplicate usernames are rejected.
    pub fn from_seeds(seeds: &[UserSeed]) -> Result<Self> {
        let store = Self::new();
        for seed in seeds {
            let user = User::new(seed.username.clone(), &seed.password, seed.role.clone())?;
            store.insert(user)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn insert(&self, user: User) -> Result<()> {
        match self.users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(IdentityError::UsernameAlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.get(username).map(|u| u.value().clone()))
    }

    async fn save(&self, user: User) -> Result<()> {
        self.insert(user)
    }

    async fn assign_role(&self, username: &str, role: &str) -> Result<()> {
        let mut user = self
            .users
            .get_mut(username)
            .ok_or(IdentityError::UserNotFound)?;
        user.role = role.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeds() -> Vec<UserSeed> {
        UserSeed::parse_list("admin:correctpw:admin,guest:guestpw:guest").unwrap()
    }

    #[tokio::test]
    async fn test_seeded_store_lookup() {
        let store = InMemoryCredentialStore::from_seeds(&seeds()).unwrap();
        assert_eq!(store.len(), 2);

        let admin = store.find_by_username("admin").await.unwrap().unwrap();
        assert_eq!(admin.role, "admin");
        assert_ne!(admin.password_hash, "correctpw");
        assert!(store.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = InMemoryCredentialStore::new();
        store
            .save(User::new("admin", "a", "admin").unwrap())
            .await
            .unwrap();
        let err = store
            .save(User::new("admin", "b", "guest").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::UsernameAlreadyExists));
    }

    #[tokio::test]
    async fn test_assign_role() {
        let store = InMemoryCredentialStore::from_seeds(&seeds()).unwrap();
        store.assign_role("guest", "admin").await.unwrap();
        let user = store.find_by_username("guest").await.unwrap().unwrap();
        assert_eq!(user.role, "admin");

        assert!(matches!(
            store.assign_role("nobody", "admin").await,
            Err(IdentityError::UserNotFound)
        ));
    }
}
