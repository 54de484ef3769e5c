//! Bearer-token authentication and role-based authorization for an HTTP API.
//!
//! HS512-signed tokens are issued at login, checked on every request by the auth gate in
//! [`middleware::auth`], and matched against an ordered path/role rule table.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod repos;
pub mod services;
pub mod state;
