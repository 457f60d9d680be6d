//! Authenticate and LoginAuth
//!
//! `login_auth` is the only path in the system that mints a token.

use crate::error::{IdentityError, Result};
use crate::models::User;
use crate::security::verify_password_or_dummy;
use crate::store::CredentialStore;
use crypto_core::TokenService;
use std::sync::Arc;
use tracing::{info, warn};

/// Token and role handed back by a successful login.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub access_token: String,
    pub role: String,
}

impl std::fmt::Debug for LoginGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginGrant")
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    /// Check a username/password pair.
    ///
    /// Unknown users and wrong passwords both fail with
    /// [`IdentityError::UserNotFound`], after the same amount of hashing work.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let user = self.store.find_by_username(username).await?;

        let password = password.to_string();
        let hash = user.as_ref().map(|u| u.password_hash.clone());
        let matched = tokio::task::spawn_blocking(move || {
            verify_password_or_dummy(&password, hash.as_deref())
        })
        .await
        .map_err(|e| IdentityError::Internal(format!("password check panicked: {}", e)))??;

        match user {
            Some(user) if matched => Ok(user),
            _ => Err(IdentityError::UserNotFound),
        }
    }

    /// Authenticate, then issue a token carrying the user's role.
    pub async fn login_auth(&self, username: &str, password: &str) -> Result<LoginGrant> {
        let user = match self.authenticate(username, password).await {
            Ok(user) => user,
            Err(e) => {
                warn!(username = %username, "login rejected");
                return Err(e);
            }
        };

        let access_token = self.tokens.issue_token(&user.username, &user.role)?;
        info!(username = %user.username, role = %user.role, "login succeeded");

        Ok(LoginGrant {
            access_token,
            role: user.role,
        })
    }
}
