//! Bearer token authentication: `Authorization` header → AuthContext in request extensions.
//!
//! This layer never rejects a request. A missing, malformed, expired or otherwise unusable
//! credential simply leaves the request anonymous; the authorization layer decides what that
//! means for the route. Failures are logged by kind, never with the token itself.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::services::auth::{AuthContext, PathList, PrincipalResolver, ResolveError, TokenService};
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Present once the authenticator has looked at a request, whatever the outcome.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticationAttempted;

#[derive(Clone)]
pub struct RequestAuthenticator {
    tokens: Arc<TokenService>,
    principals: Arc<dyn PrincipalResolver>,
    bypass: Arc<PathList>,
}

impl RequestAuthenticator {
    pub fn new(
        tokens: Arc<TokenService>,
        principals: Arc<dyn PrincipalResolver>,
        bypass: Arc<PathList>,
    ) -> Self {
        Self {
            tokens,
            principals,
            bypass,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.tokens.clone(),
            state.principals.clone(),
            state.bypass.clone(),
        )
    }

    /// `None` means the request stays anonymous.
    pub async fn authenticate(&self, headers: &HeaderMap, path: &str) -> Option<AuthContext> {
        if self.bypass.matches(path) {
            return None;
        }

        let token = bearer_token(headers)?;

        let claims = match self.tokens.validate(token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, path = %path, "bearer token rejected");
                return None;
            }
        };

        let principal = match self.principals.resolve(&claims.sub).await {
            Ok(principal) => principal,
            Err(ResolveError::NotFound) => {
                warn!(subject = %claims.sub, "token subject has no principal");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "principal resolution failed");
                return None;
            }
        };

        if !self.tokens.validate_against_principal(token, &principal) {
            warn!(subject = %claims.sub, "token does not belong to resolved principal");
            return None;
        }

        if let Err(e) = principal.status.check() {
            warn!(username = %principal.username, error = %e, "principal not usable");
            return None;
        }

        debug!(username = %principal.username, "request authenticated");
        Some(AuthContext::from_principal(&principal))
    }
}

/// Everything after an exact, case-sensitive `"Bearer "` prefix, untrimmed. An empty credential
/// counts as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .filter(|t| !t.is_empty())
}

pub(super) async fn authenticate_middleware(
    State(state): State<AppState>,
    OriginalUri(original_uri): OriginalUri,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if req.extensions().get::<AuthenticationAttempted>().is_some() {
        return next.run(req).await;
    }
    req.extensions_mut().insert(AuthenticationAttempted);

    let authenticator = RequestAuthenticator::from_state(&state);
    if let Some(ctx) = authenticator
        .authenticate(req.headers(), original_uri.path())
        .await
    {
        req.extensions_mut().insert(ctx);
    }

    next.run(req).await
}
