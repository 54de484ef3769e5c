/*
 * Responsibility
 * - users / user_roles tables via SQLx
 * - principal lookup by username or email (PrincipalResolver)
 * - the few writes the auth endpoints need (signup, last login)
 *
 * Schema: migrations/0001_create_users.sql
 */
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{error, warn};
use uuid::Uuid;

use crate::repos::error::{RepoError, RepoResult};
use crate::services::auth::principal::{
    AccountStatus, Principal, PrincipalResolver, ResolveError,
};
use crate::services::auth::role::Role;

/// A principal together with its stored password hash. Only the login flow sees this.
#[derive(Clone)]
pub struct StoredCredentials {
    pub principal: Principal,
    pub password_hash: String,
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: HashSet<Role>,
}

/// Storage operations used by the auth endpoints, on top of principal lookup.
#[async_trait]
pub trait UserStore: PrincipalResolver {
    async fn find_credentials(&self, identifier: &str) -> RepoResult<Option<StoredCredentials>>;
    async fn exists_by_username(&self, username: &str) -> RepoResult<bool>;
    async fn exists_by_email(&self, email: &str) -> RepoResult<bool>;
    async fn create(&self, user: NewUser) -> RepoResult<Principal>;
    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()>;
}

/// Display name: first and last name when present, otherwise the username.
pub fn full_name(username: &str, first_name: Option<&str>, last_name: Option<&str>) -> String {
    if first_name.is_none() && last_name.is_none() {
        return username.to_string();
    }
    format!(
        "{} {}",
        first_name.unwrap_or_default(),
        last_name.unwrap_or_default()
    )
    .trim()
    .to_string()
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    first_name: Option<String>,
    last_name: Option<String>,
    enabled: bool,
    account_non_locked: bool,
    account_non_expired: bool,
    credentials_non_expired: bool,
    roles: Vec<String>,
}

impl UserRow {
    fn into_credentials(self) -> StoredCredentials {
        let roles = self
            .roles
            .iter()
            .filter_map(|name| match name.parse::<Role>() {
                Ok(role) => Some(role),
                Err(e) => {
                    warn!(user_id = %self.id, error = %e, "ignoring unknown role");
                    None
                }
            })
            .collect();

        let principal = Principal {
            id: self.id,
            full_name: full_name(
                &self.username,
                self.first_name.as_deref(),
                self.last_name.as_deref(),
            ),
            username: self.username,
            email: self.email,
            roles,
            status: AccountStatus {
                enabled: self.enabled,
                account_non_locked: self.account_non_locked,
                account_non_expired: self.account_non_expired,
                credentials_non_expired: self.credentials_non_expired,
            },
        };

        StoredCredentials {
            principal,
            password_hash: self.password_hash,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserRepo {
    async fn find_credentials(&self, identifier: &str) -> RepoResult<Option<StoredCredentials>> {
        // A username match wins over an email match of another account.
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                u.id,
                u.username,
                u.email,
                u.password_hash,
                u.first_name,
                u.last_name,
                u.enabled,
                u.account_non_locked,
                u.account_non_expired,
                u.credentials_non_expired,
                COALESCE(array_agg(r.role) FILTER (WHERE r.role IS NOT NULL), '{}') AS roles
            FROM users u
            LEFT JOIN user_roles r ON r.user_id = u.id
            WHERE u.username = $1 OR u.email = $1
            GROUP BY u.id
            ORDER BY (u.username = $1) DESC
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_credentials))
    }

    async fn exists_by_username(&self, username: &str) -> RepoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)"#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>(r#"SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)"#)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn create(&self, user: NewUser) -> RepoResult<Principal> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.first_name.as_deref())
        .bind(user.last_name.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(RepoError::from_sqlx)?;

        for role in &user.roles {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role)
                VALUES ($1, $2)
                "#,
            )
            .bind(id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Principal {
            id,
            full_name: full_name(
                &user.username,
                user.first_name.as_deref(),
                user.last_name.as_deref(),
            ),
            username: user.username,
            email: user.email,
            roles: user.roles,
            status: AccountStatus::active(),
        })
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_login = $2, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PrincipalResolver for PgUserRepo {
    async fn resolve(&self, identifier: &str) -> Result<Principal, ResolveError> {
        match self.find_credentials(identifier).await {
            Ok(Some(found)) => Ok(found.principal),
            Ok(None) => Err(ResolveError::NotFound),
            Err(e) => {
                error!(error = %e, "principal lookup failed");
                Err(ResolveError::Unavailable(e.to_string()))
            }
        }
    }
}
