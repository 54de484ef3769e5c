/*
 * Responsibility
 * - GET /api/profile: the authenticated caller's account
 */
use axum::{Json, extract::State};

use crate::api::dto::auth::ProfileResponse;
use crate::api::dto::message::MessageResponse;
use crate::api::extractors::AuthCtxExtractor;
use crate::error::AppError;
use crate::services::auth::ResolveError;
use crate::state::AppState;

pub async fn profile(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> Result<Json<MessageResponse<ProfileResponse>>, AppError> {
    let principal = state
        .principals
        .resolve(&ctx.username)
        .await
        .map_err(|e| match e {
            ResolveError::NotFound => AppError::NotFound("user"),
            ResolveError::Unavailable(reason) => {
                tracing::error!(error = %reason, "principal resolution failed");
                AppError::Internal
            }
        })?;

    Ok(Json(MessageResponse::success_with(
        "user profile",
        ProfileResponse::from(&principal),
    )))
}
