// This is the entry point of the game backend.
//
// **Architecture Overview:**
// - `core/` = Business logic (engine services over storage traits)
// - `infra/` = Implementations of core traits (PostgreSQL, AI HTTP client)
// - `http/` = The axum boundary (routes, auth gate, error envelope)
//
// This file's job is to:
// 1. Load configuration
// 2. Connect to and migrate the database
// 3. Initialize services (dependency injection)
// 4. Serve the HTTP API

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a handful of mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "http/http_layer.rs"]
mod http;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::core::adventure::AdventureService;
use crate::core::auth::AuthService;
use crate::core::goal::GoalService;
use crate::core::mission::MissionService;
use crate::core::profile::ProfileService;
use crate::core::shop::ShopService;
use crate::core::tamagotchi::TamagotchiService;
use crate::core::wallet::WalletService;
use crate::http::state::AppState;
use crate::infra::adventure::PgAdventureStore;
use crate::infra::ai::AdventureApiClient;
use crate::infra::auth::PgUserStore;
use crate::infra::goal::PgGoalStore;
use crate::infra::mission::PgMissionStore;
use crate::infra::profile::PgProfileStore;
use crate::infra::shop::PgShopStore;
use crate::infra::tamagotchi::PgTamagotchiStore;
use crate::infra::wallet::PgWalletStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    let pool = infra::db::connect(&config.db).await?;
    infra::db::migrate(&pool).await?;
    tracing::info!(database = %config.db.database, "database schema ready");

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let auth = Arc::new(AuthService::new(
        PgUserStore::new(pool.clone()),
        &config.jwt_secret,
        config.jwt_expiration_secs,
    ));
    let profiles = Arc::new(ProfileService::new(PgProfileStore::new(pool.clone())));
    let wallets = Arc::new(WalletService::new(PgWalletStore::new(pool.clone())));
    let shop = Arc::new(ShopService::new(PgShopStore::new(pool.clone())));
    let missions = Arc::new(MissionService::new(PgMissionStore::new(pool.clone())));
    let tamagotchi = Arc::new(TamagotchiService::new(PgTamagotchiStore::new(pool.clone())));
    let goals = Arc::new(GoalService::new(PgGoalStore::new(pool.clone())));

    let ai_client = AdventureApiClient::new(config.ai.clone())?;
    tracing::info!(url = %config.ai.base_url, "adventure AI client configured");
    let adventures = Arc::new(AdventureService::new(
        PgAdventureStore::new(pool.clone()),
        ai_client,
        PgProfileStore::new(pool.clone()),
        PgGoalStore::new(pool.clone()),
    ));

    let state = AppState {
        auth,
        profiles,
        wallets,
        shop,
        missions,
        tamagotchi,
        goals,
        adventures,
    };

    let cors = cors_layer(config.cors_origin.as_deref())?;
    let app = http::router::build(state, &config.api_prefix, cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, prefix = %config.api_prefix, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    Ok(match origin {
        None | Some("*") => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
    })
}
