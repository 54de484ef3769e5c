/*
 * Responsibility
 * - The authenticated identity of a single request
 * - Built by the request authenticator, stored in request extensions, read by the
 *   authorization layer and handlers
 *
 * Notes
 * - Lives only as long as the request; never cache it or hand it to background tasks
 */
use std::collections::HashSet;

use uuid::Uuid;

use crate::services::auth::principal::{AccountStatus, Principal};
use crate::services::auth::role::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub principal_id: Uuid,
    pub username: String,
    pub roles: HashSet<Role>,
    pub status: AccountStatus,
}

impl AuthContext {
    pub fn from_principal(principal: &Principal) -> Self {
        Self {
            principal_id: principal.id,
            username: principal.username.clone(),
            roles: principal.roles.clone(),
            status: principal.status,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.roles.contains(r))
    }
}
