/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - Hand the request's AuthContext to handlers
 * - The authenticator middleware inserts it into request extensions; when it is absent the
 *   request is rejected with the same 401 body the authorization layer produces
 */
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::AuthContext;
use crate::state::AppState;

pub struct AuthCtxExtractor(pub AuthContext);

impl FromRequestParts<AppState> for AuthCtxExtractor
where
    AppState: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthCtxExtractor)
            .ok_or(AppError::AuthenticationRequired)
    }
}
