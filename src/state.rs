/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 * - Everything inside is immutable after startup or internally synchronised; Clone is cheap
 */
use std::sync::Arc;

use crate::repos::UserStore;
use crate::services::auth::{PasswordVerifier, PathList, PrincipalResolver, RuleTable, TokenService};

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub principals: Arc<dyn PrincipalResolver>,
    pub users: Arc<dyn UserStore>,
    pub passwords: Arc<dyn PasswordVerifier>,
    pub bypass: Arc<PathList>,
    pub rules: Arc<RuleTable>,
}

impl AppState {
    /// `store` serves both principal resolution and the account endpoints.
    pub fn new<S>(
        tokens: TokenService,
        store: Arc<S>,
        passwords: Arc<dyn PasswordVerifier>,
        bypass: PathList,
        rules: RuleTable,
    ) -> Self
    where
        S: UserStore + 'static,
    {
        Self {
            tokens: Arc::new(tokens),
            principals: store.clone(),
            users: store,
            passwords,
            bypass: Arc::new(bypass),
            rules: Arc::new(rules),
        }
    }
}
