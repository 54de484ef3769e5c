/*
 * Responsibility
 * - Config → dependencies → Router
 * - Middleware order: routes ← auth gate ← transport layers
 * - axum::serve()
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware;
use crate::middleware::http::HttpLimits;
use crate::repos::PgUserRepo;
use crate::services::auth::{BcryptVerifier, TokenService};
use crate::state::AppState;

fn init_tracing() {
    // RUST_LOG wins when set, e.g. RUST_LOG=info,rolegate=debug,tower_http=debug
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: crash the process. Production: default hook, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting rolegate in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!().run(&pool).await?;

    let state = build_state(&config, Arc::new(PgUserRepo::new(pool)));
    let app = build_router(
        state,
        HttpLimits {
            timeout: config.request_timeout,
            body_limit: config.request_body_limit,
        },
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_state(config: &Config, repo: Arc<PgUserRepo>) -> AppState {
    AppState::new(
        TokenService::new(config.signing.clone()),
        repo,
        Arc::new(BcryptVerifier::new(config.bcrypt_cost)),
        config.bypass.clone(),
        config.rules.clone(),
    )
}

/// Full router: routes behind the auth gate, everything behind the transport layers.
pub fn build_router(state: AppState, limits: HttpLimits) -> Router {
    let router = middleware::auth::apply(api::routes(), state.clone()).with_state(state);
    middleware::http::apply(router, limits)
}
