use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::services::auth::role::Role;

/// Account-status flags carried by every principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    pub enabled: bool,
    pub account_non_locked: bool,
    pub account_non_expired: bool,
    pub credentials_non_expired: bool,
}

impl AccountStatus {
    pub fn active() -> Self {
        Self {
            enabled: true,
            account_non_locked: true,
            account_non_expired: true,
            credentials_non_expired: true,
        }
    }

    /// Checked in a fixed order; the first failing flag is reported.
    pub fn check(&self) -> Result<(), AccountStatusError> {
        if !self.enabled {
            return Err(AccountStatusError::Disabled);
        }
        if !self.account_non_locked {
            return Err(AccountStatusError::Locked);
        }
        if !self.account_non_expired {
            return Err(AccountStatusError::Expired);
        }
        if !self.credentials_non_expired {
            return Err(AccountStatusError::CredentialsExpired);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccountStatusError {
    #[error("principal disabled")]
    Disabled,
    #[error("principal locked")]
    Locked,
    #[error("principal expired")]
    Expired,
    #[error("credentials expired")]
    CredentialsExpired,
}

/// Resolved identity. A plain value: it knows nothing about how it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub roles: HashSet<Role>,
    pub status: AccountStatus,
}

impl Principal {
    /// Roles in a stable order, for responses.
    pub fn sorted_roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.roles.iter().copied().collect();
        roles.sort();
        roles
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("principal not found")]
    NotFound,
    #[error("principal lookup failed: {0}")]
    Unavailable(String),
}

/// Maps a username or email to a principal.
///
/// Implementations may block on storage; callers must not hold locks across the call.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    async fn resolve(&self, identifier: &str) -> Result<Principal, ResolveError>;
}
