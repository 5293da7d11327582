use crate::error::AccessError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Upload,
    Query,
    List,
    Delete,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Upload => "upload documents",
            Action::Query => "query documents",
            Action::List => "list documents",
            Action::Delete => "delete documents",
        }
    }

    fn requires_admin(self) -> bool {
        matches!(self, Action::Upload | Action::Delete)
    }
}

/// Per-connection login state, handed to every service call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub username: String,
    pub role: Option<Role>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_admin(&self) -> bool {
        self.authenticated && self.role == Some(Role::Admin)
    }

    pub fn authorize(&self, action: Action) -> Result<(), AccessError> {
        if !self.authenticated {
            return Err(AccessError::NotAuthenticated);
        }
        if action.requires_admin() && !self.is_admin() {
            return Err(AccessError::Forbidden {
                username: self.username.clone(),
                action: action.verb().to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Credential {
    password: String,
    role: Role,
}

/// Static username → password/role table checked at login.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: HashMap<String, Credential>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self::new()
            .with_user("admin", "admin123", Role::Admin)
            .with_user("user1", "user123", Role::User)
    }

    pub fn with_user(mut self, username: &str, password: &str, role: Role) -> Self {
        self.users.insert(
            username.to_string(),
            Credential {
                password: password.to_string(),
                role,
            },
        );
        self
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Session, AccessError> {
        match self.users.get(username) {
            Some(credential) if credential.password == password => Ok(Session {
                authenticated: true,
                username: username.to_string(),
                role: Some(credential.role),
            }),
            _ => Err(AccessError::InvalidCredentials),
        }
    }
}
