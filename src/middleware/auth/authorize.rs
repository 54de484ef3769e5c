//! Path-based authorization over the rule table.
//!
//! Runs after the authenticator. This is the only place protected routes are refused:
//! no context ⇒ 401, context without the required role ⇒ 403.

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::AuthContext;
use crate::state::AppState;

pub(super) async fn authorize_middleware(
    State(state): State<AppState>,
    OriginalUri(original_uri): OriginalUri,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let path = original_uri.path();
    let ctx = req.extensions().get::<AuthContext>();

    if let Err(denial) = state.rules.evaluate(path, ctx) {
        tracing::info!(
            path = %path,
            username = ctx.map(|c| c.username.as_str()).unwrap_or("-"),
            reason = %denial,
            "request denied"
        );
        return Err(denial.into());
    }

    Ok(next.run(req).await)
}
