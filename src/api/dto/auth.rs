/*
 * Responsibility
 * - Request/response DTOs for the /auth endpoints and /api/profile
 * - validate() does shape checks only; lookups and uniqueness belong to the handlers
 */
use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::auth::{AccountStatus, IssuedToken, Principal, Role};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 100;
const EMAIL_MAX: usize = 100;
const NAME_MAX: usize = 50;

fn check_username(username: &str) -> Result<(), String> {
    let len = username.trim().chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(format!(
            "username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
        ));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(format!(
            "password must be between {PASSWORD_MIN} and {PASSWORD_MAX} characters"
        ));
    }
    Ok(())
}

fn check_name(field: &str, value: Option<&str>) -> Result<(), String> {
    if let Some(v) = value
        && v.chars().count() > NAME_MAX
    {
        return Err(format!("{field} must be at most {NAME_MAX} characters"));
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("username is required".into());
        }
        check_username(&self.username)?;
        if self.password.is_empty() {
            return Err("password is required".into());
        }
        check_password(&self.password)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("roles", &self.roles)
            .finish()
    }
}

impl SignupRequest {
    /// Checks the shape and returns the requested roles.
    pub fn validate(&self) -> Result<HashSet<Role>, String> {
        check_username(&self.username)?;

        let email = self.email.trim();
        if email.is_empty() {
            return Err("email is required".into());
        }
        if email.chars().count() > EMAIL_MAX {
            return Err(format!("email must be at most {EMAIL_MAX} characters"));
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err("email must be a valid address".into()),
        }

        check_password(&self.password)?;
        check_name("firstName", self.first_name.as_deref())?;
        check_name("lastName", self.last_name.as_deref())?;

        if self.roles.is_empty() {
            return Err("at least one role is required".into());
        }
        self.roles
            .iter()
            .map(|name| {
                name.trim()
                    .parse::<Role>()
                    .map_err(|_| format!("unknown role: {}", name.trim()))
            })
            .collect()
    }
}

#[derive(Deserialize)]
pub struct QuickSignupRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for QuickSignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuickSignupRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl QuickSignupRequest {
    pub fn validate(&self) -> Result<(), String> {
        check_username(&self.username)?;
        check_password(&self.password)
    }

    /// Placeholder address for accounts created without one.
    pub fn email(&self) -> String {
        format!("{}@example.com", self.username.trim())
    }
}

/// Body of a successful login or refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub roles: Vec<Role>,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
}

impl AuthResponse {
    pub fn new(issued: IssuedToken, principal: &Principal) -> Self {
        Self {
            expires_in: issued.expires_in(),
            expires_at: issued.expires_at,
            token: issued.token,
            token_type: "Bearer",
            username: principal.username.clone(),
            email: principal.email.clone(),
            full_name: principal.full_name.clone(),
            roles: principal.sorted_roles(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub roles: Vec<Role>,
    pub account_status: AccountStatus,
}

impl From<&Principal> for ProfileResponse {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.id,
            username: p.username.clone(),
            email: p.email.clone(),
            full_name: p.full_name.clone(),
            roles: p.sorted_roles(),
            account_status: p.status,
        }
    }
}
