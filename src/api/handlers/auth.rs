/*
 * Responsibility
 * - /auth handlers: login, signup, quick signup, refresh, logout, verify
 * - The /auth prefix is on the bypass list, so handlers that need a token read and check it
 *   themselves
 * - bcrypt work runs on the blocking pool
 */
use std::collections::HashSet;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use tracing::{error, info, warn};

use crate::api::dto::auth::{
    AuthResponse, LoginRequest, ProfileResponse, QuickSignupRequest, SignupRequest,
};
use crate::api::dto::message::MessageResponse;
use crate::error::AppError;
use crate::middleware::auth::bearer_token;
use crate::repos::NewUser;
use crate::services::auth::token_service::TokenIntrospection;
use crate::services::auth::{ResolveError, Role};
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    req.validate().map_err(AppError::InvalidRequest)?;

    let Some(found) = state.users.find_credentials(req.username.trim()).await? else {
        warn!(identifier = %req.username, "login for unknown user");
        return Err(AppError::InvalidCredentials);
    };

    let passwords = state.passwords.clone();
    let stored_hash = found.password_hash;
    let password = req.password;
    let matches = tokio::task::spawn_blocking(move || passwords.verify(&password, &stored_hash))
        .await
        .map_err(|e| {
            error!(error = %e, "password verification task failed");
            AppError::Internal
        })?;

    let principal = found.principal;
    if !matches {
        warn!(username = %principal.username, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    if let Err(e) = principal.status.check() {
        warn!(username = %principal.username, error = %e, "login for unusable account");
        return Err(AppError::InvalidCredentials);
    }

    let issued = state.tokens.issue(&principal.username)?;

    if let Err(e) = state.users.record_login(principal.id, issued.issued_at).await {
        warn!(username = %principal.username, error = %e, "failed to record last login");
    }

    info!(username = %principal.username, "login succeeded");
    Ok(Json(AuthResponse::new(issued, &principal)))
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse<ProfileResponse>>), AppError> {
    let roles = req.validate().map_err(AppError::InvalidRequest)?;

    register(
        &state,
        Registration {
            username: req.username.trim().to_string(),
            email: req.email.trim().to_string(),
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            roles,
        },
    )
    .await
}

/// Creates a USER account with a placeholder email.
pub async fn signup_quick(
    State(state): State<AppState>,
    Json(req): Json<QuickSignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse<ProfileResponse>>), AppError> {
    req.validate().map_err(AppError::InvalidRequest)?;

    register(
        &state,
        Registration {
            username: req.username.trim().to_string(),
            email: req.email(),
            password: req.password,
            first_name: None,
            last_name: None,
            roles: HashSet::from([Role::User]),
        },
    )
    .await
}

struct Registration {
    username: String,
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
    roles: HashSet<Role>,
}

async fn register(
    state: &AppState,
    registration: Registration,
) -> Result<(StatusCode, Json<MessageResponse<ProfileResponse>>), AppError> {
    if state.users.exists_by_username(&registration.username).await? {
        return Err(AppError::conflict("username is already taken"));
    }
    if state.users.exists_by_email(&registration.email).await? {
        return Err(AppError::conflict("email is already in use"));
    }

    let passwords = state.passwords.clone();
    let password = registration.password;
    let password_hash = tokio::task::spawn_blocking(move || passwords.hash(&password))
        .await
        .map_err(|e| {
            error!(error = %e, "password hashing task failed");
            AppError::Internal
        })??;

    // A concurrent signup can still win the race; the unique index turns that into Conflict.
    let principal = state
        .users
        .create(NewUser {
            username: registration.username,
            email: registration.email,
            password_hash,
            first_name: registration.first_name,
            last_name: registration.last_name,
            roles: registration.roles,
        })
        .await?;

    info!(username = %principal.username, roles = ?principal.sorted_roles(), "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::success_with(
            "user registered",
            ProfileResponse::from(&principal),
        )),
    ))
}

/// Re-signs the caller's token with a fresh expiry. Expired tokens cannot be refreshed.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthResponse>, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::invalid_request("bearer token is required"))?;

    let claims = state.tokens.validate(token)?;

    let principal = match state.principals.resolve(&claims.sub).await {
        Ok(principal) => principal,
        Err(ResolveError::NotFound) => {
            warn!(subject = %claims.sub, "refresh for unknown principal");
            return Err(AppError::Unauthorized("invalid token".into()));
        }
        Err(e) => {
            error!(error = %e, "principal resolution failed");
            return Err(AppError::Internal);
        }
    };

    if let Err(e) = principal.status.check() {
        warn!(username = %principal.username, error = %e, "refresh for unusable account");
        return Err(AppError::Unauthorized("account is not active".into()));
    }

    let issued = state.tokens.refresh(token)?;
    Ok(Json(AuthResponse::new(issued, &principal)))
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse::success("logged out"))
}

pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse<TokenIntrospection>>, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::invalid_request("bearer token is required"))?;

    state.tokens.validate(token)?;

    let info = state
        .tokens
        .introspect(token)
        .map_err(|e| AppError::Unauthorized(e.error))?;

    Ok(Json(MessageResponse::success_with("token valid", info)))
}
