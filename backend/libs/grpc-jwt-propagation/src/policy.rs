//! Method-level access policy
//!
//! Maps fully-qualified gRPC method paths (`/package.Service/Method`) to the
//! roles allowed to call them. A method without an entry is public.
//!
//! A second table records whether a method requires authentication. It is
//! derived from the role table unless set explicitly, and [`AccessPolicy::validate`]
//! rejects a policy where the two disagree.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("malformed policy entry: {0}")]
    Malformed(String),

    #[error("method {0} lists allowed roles but is marked as not requiring authentication")]
    Inconsistent(String),
}

/// One row of the role table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicyEntry {
    pub method: String,
    pub allowed_roles: HashSet<String>,
}

impl AccessPolicyEntry {
    pub fn new<I, R>(method: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            method: method.into(),
            allowed_roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// Read-only after construction; share behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    roles: HashMap<String, HashSet<String>>,
    requires_auth: HashMap<String, bool>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = AccessPolicyEntry>,
    {
        let mut policy = Self::new();
        for entry in entries {
            policy = policy.with_entry(entry);
        }
        policy
    }

    /// Add or extend the allowed roles of a method.
    pub fn with_entry(mut self, entry: AccessPolicyEntry) -> Self {
        self.roles
            .entry(entry.method)
            .or_default()
            .extend(entry.allowed_roles);
        self
    }

    /// Explicitly record whether `method` requires authentication.
    pub fn with_authentication(mut self, method: impl Into<String>, required: bool) -> Self {
        self.requires_auth.insert(method.into(), required);
        self
    }

    /// Parse `method=role1|role2;method2=role3`.
    ///
    /// `method=` with no roles marks the method public.
    pub fn parse(spec: &str) -> Result<Self, PolicyError> {
        let mut policy = Self::new();

        for raw in spec.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (method, roles) = raw
                .split_once('=')
                .ok_or_else(|| PolicyError::Malformed(raw.to_string()))?;
            let method = method.trim();
            if !method.starts_with('/') || method.len() < 2 {
                return Err(PolicyError::Malformed(raw.to_string()));
            }

            let roles: HashSet<String> = roles
                .split('|')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();

            if roles.is_empty() {
                policy = policy.with_authentication(method, false);
            } else {
                policy = policy.with_entry(AccessPolicyEntry {
                    method: method.to_string(),
                    allowed_roles: roles,
                });
            }
        }

        Ok(policy)
    }

    /// Allowed roles for `method`, or `None` when the method is public.
    pub fn allowed_roles(&self, method: &str) -> Option<&HashSet<String>> {
        self.roles.get(method)
    }

    pub fn requires_authentication(&self, method: &str) -> bool {
        self.requires_auth
            .get(method)
            .copied()
            .unwrap_or_else(|| self.roles.contains_key(method))
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Reject policies where a role-restricted method is marked public.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for method in self.roles.keys() {
            if self.requires_auth.get(method) == Some(&false) {
                return Err(PolicyError::Inconsistent(method.clone()));
            }
        }
        Ok(())
    }
}
