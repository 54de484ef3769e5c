/*
 * Responsibility
 * - The single HTTP-facing error type (AppError)
 * - IntoResponse: status code + generic envelope {message, success:false, data:{code}}
 * - Conversions from the lower layers (repo, token, password, authorization denial)
 *
 * Messages never carry tokens, keys, passwords or hashes.
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::api::dto::message::MessageResponse;
use crate::repos::error::RepoError;
use crate::services::auth::TokenError;
use crate::services::auth::password::PasswordError;
use crate::services::auth::rules::Denial;

#[derive(Debug, Serialize)]
pub struct ErrorData {
    pub code: &'static str,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("access denied")]
    Forbidden,
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) | AppError::AuthenticationRequired => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            AppError::Forbidden => "ACCESS_DENIED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal => "INTERNAL_SERVER_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::InvalidRequest(message)
            | AppError::Unauthorized(message)
            | AppError::Conflict(message) => message.clone(),
            AppError::InvalidCredentials => "invalid credentials".into(),
            AppError::AuthenticationRequired => "authentication required".into(),
            AppError::Forbidden => "access denied".into(),
            AppError::NotFound(resource) => format!("{resource} not found."),
            AppError::Internal => "internal server error".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = MessageResponse::error_with(self.message(), ErrorData { code: self.code() });

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::AuthenticationRequired => AppError::AuthenticationRequired,
            Denial::AuthorizationDenied => AppError::Forbidden,
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict => AppError::conflict("username or email already in use"),
            RepoError::Db(e) => {
                tracing::error!(error = %e, "database failure");
                AppError::Internal
            }
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AppError::Unauthorized("token expired".into()),
            TokenError::Signing => {
                tracing::error!(error = %e, "token signing failed");
                AppError::Internal
            }
            _ => AppError::Unauthorized("invalid token".into()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(e: PasswordError) -> Self {
        tracing::error!(error = %e, "password hashing failed");
        AppError::Internal
    }
}
