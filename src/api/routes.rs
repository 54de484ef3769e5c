/*
 * Responsibility
 * - URL structure of the service
 * - Which paths are public or protected is decided by the rule table, not here
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{auth, profile, public};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::index))
        .route("/health", get(public::health))
        .route("/public/info", get(public::info))
        .route("/auth/login", post(auth::login))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/signup/quick", post(auth::signup_quick))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/verify", get(auth::verify))
        .route("/api/profile", get(profile::profile))
        .fallback(public::not_found)
}
