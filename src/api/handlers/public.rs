/*
 * Responsibility
 * - Unauthenticated endpoints: /, /health, /public/info
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;

use crate::api::dto::message::MessageResponse;
use crate::error::AppError;
use crate::services::auth::Role;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

pub async fn index() -> Json<MessageResponse> {
    Json(MessageResponse::success_with(
        "service is running",
        json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    pub name: Role,
    pub display_name: &'static str,
    pub description: &'static str,
    pub authority: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub roles: Vec<RoleInfo>,
}

pub async fn info() -> Json<MessageResponse<ServiceInfo>> {
    let roles = Role::ALL
        .into_iter()
        .map(|role| RoleInfo {
            name: role,
            display_name: role.display_name(),
            description: role.description(),
            authority: role.authority(),
        })
        .collect();

    Json(MessageResponse::success_with(
        "public service information",
        ServiceInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            roles,
        },
    ))
}

pub async fn not_found() -> AppError {
    AppError::NotFound("resource")
}
