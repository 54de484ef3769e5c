//! Shared fixtures for the HTTP integration tests: an in-memory user store and a fully wired
//! router (auth gate + transport layers) around it.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use rolegate::api;
use rolegate::middleware;
use rolegate::middleware::http::HttpLimits;
use rolegate::repos::error::{RepoError, RepoResult};
use rolegate::repos::user_repo::full_name;
use rolegate::repos::{NewUser, StoredCredentials, UserStore};
use rolegate::services::auth::password;
use rolegate::services::auth::{
    AccountStatus, BcryptVerifier, PathList, Principal, PrincipalResolver, ResolveError, Role,
    RuleTable, SigningConfig, TokenService,
};
use rolegate::state::AppState;

pub const SECRET: &str = "integration-test-secret-0123456789-0123456789-0123456789-abcdefgh";
pub const ISSUER: &str = "rolegate-test";
pub const PASSWORD: &str = "correct-horse";

#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<String, StoredCredentials>>,
    logins: RwLock<HashMap<Uuid, DateTime<Utc>>>,
    resolves: AtomicUsize,
}

impl InMemoryStore {
    pub fn insert(&self, principal: Principal, password: &str) {
        let password_hash = bcrypt::hash(password, password::MIN_COST).unwrap();
        self.users.write().unwrap().insert(
            principal.username.clone(),
            StoredCredentials {
                principal,
                password_hash,
            },
        );
    }

    /// How many times the store was asked to resolve a principal.
    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn last_login_for(&self, username: &str) -> Option<DateTime<Utc>> {
        let id = self.users.read().unwrap().get(username)?.principal.id;
        self.logins.read().unwrap().get(&id).copied()
    }

    fn lookup(&self, identifier: &str) -> Option<StoredCredentials> {
        let users = self.users.read().unwrap();
        users.get(identifier).cloned().or_else(|| {
            users
                .values()
                .find(|c| c.principal.email == identifier)
                .cloned()
        })
    }
}

#[async_trait]
impl PrincipalResolver for InMemoryStore {
    async fn resolve(&self, identifier: &str) -> Result<Principal, ResolveError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.lookup(identifier)
            .map(|c| c.principal)
            .ok_or(ResolveError::NotFound)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_credentials(&self, identifier: &str) -> RepoResult<Option<StoredCredentials>> {
        Ok(self.lookup(identifier))
    }

    async fn exists_by_username(&self, username: &str) -> RepoResult<bool> {
        Ok(self.users.read().unwrap().contains_key(username))
    }

    async fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .any(|c| c.principal.email == email))
    }

    async fn create(&self, user: NewUser) -> RepoResult<Principal> {
        let mut users = self.users.write().unwrap();
        if users.contains_key(&user.username)
            || users.values().any(|c| c.principal.email == user.email)
        {
            return Err(RepoError::Conflict);
        }

        let principal = Principal {
            id: Uuid::new_v4(),
            full_name: full_name(
                &user.username,
                user.first_name.as_deref(),
                user.last_name.as_deref(),
            ),
            username: user.username.clone(),
            email: user.email,
            roles: user.roles,
            status: AccountStatus::active(),
        };
        users.insert(
            user.username,
            StoredCredentials {
                principal: principal.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(principal)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        self.logins.write().unwrap().insert(id, at);
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub tokens: Arc<TokenService>,
    pub store: Arc<InMemoryStore>,
}

pub fn signing() -> SigningConfig {
    SigningConfig::new(SECRET, ISSUER, Duration::from_secs(3600)).unwrap()
}

pub fn principal(username: &str, roles: &[Role]) -> Principal {
    Principal {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        full_name: username.to_string(),
        roles: roles.iter().copied().collect::<HashSet<_>>(),
        status: AccountStatus::active(),
    }
}

async fn ok() -> &'static str {
    "ok"
}

pub fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::default());
    store.insert(principal("admin", &[Role::Admin]), PASSWORD);
    store.insert(principal("manager", &[Role::Manager]), PASSWORD);
    store.insert(principal("user", &[Role::User]), PASSWORD);
    store
}

/// Default bypass list and rule table over `store`.
pub fn test_state(store: Arc<InMemoryStore>) -> AppState {
    AppState::new(
        TokenService::new(signing()),
        store,
        Arc::new(BcryptVerifier::new(password::MIN_COST)),
        PathList::default(),
        RuleTable::default(),
    )
}

/// Router with the real routes plus a few stand-in protected routes, seeded with one user per
/// role (`admin`, `manager`, `user`, all with [`PASSWORD`]).
pub fn test_app() -> TestApp {
    let store = seeded_store();
    let state = test_state(store.clone());
    let tokens = state.tokens.clone();

    let routes = api::routes()
        .route("/admin/reports", get(ok))
        .route("/management/team", get(ok))
        .route("/api/items", get(ok));
    let router = middleware::auth::apply(routes, state.clone()).with_state(state);
    let router = middleware::http::apply(router, HttpLimits::default());

    TestApp {
        router,
        tokens,
        store,
    }
}

impl TestApp {
    pub fn token_for(&self, username: &str) -> String {
        self.tokens.issue(username).unwrap().token
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }
}

pub fn get_with_auth(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}
