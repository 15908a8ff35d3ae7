//! Caller identity

use std::collections::BTreeSet;

/// The user on whose behalf a domain service runs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Principal {
    name: String,
    authenticated: bool,
    roles: BTreeSet<String>,
}

impl Principal {
    /// Unauthenticated caller
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Authenticated caller named `name`
    pub fn authenticated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authenticated: true,
            roles: BTreeSet::new(),
        }
    }

    /// Add a role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// User name, empty for anonymous callers
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the caller is authenticated
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Whether the caller holds `role`
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Held roles in order
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }
}
