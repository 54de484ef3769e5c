//! Request-time auth gate.
//!
//! ```ignore
//! let router = middleware::auth::apply(routes, state.clone());
//! ```
//!
//! The authenticator wraps the evaluator, so every request is authenticated (or left
//! anonymous) before its path is checked against the rule table.

mod authenticate;
mod authorize;

use axum::{Router, middleware::from_fn_with_state};

use crate::state::AppState;

pub use authenticate::{AuthenticationAttempted, RequestAuthenticator, bearer_token};

pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8: from_fn cannot take State, so pass it explicitly. The last layer added runs first.
    router
        .layer(from_fn_with_state(
            state.clone(),
            authorize::authorize_middleware,
        ))
        .layer(from_fn_with_state(
            state,
            authenticate::authenticate_middleware,
        ))
}
