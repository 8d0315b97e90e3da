// Route table. Everything except /health and /auth sits behind the auth
// gate; the whole tree is mounted under the configurable API prefix.

use axum::routing::{delete, get, post};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::http::auth_gate::require_auth;
use crate::http::state::AppState;
use crate::http::{adventure, auth, goals, missions, profile, shop, tamagotchi, wallet};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn build(state: AppState, api_prefix: &str, cors: CorsLayer) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected = Router::new()
        .route(
            "/profile",
            post(profile::create_profile).get(profile::get_profile),
        )
        .route("/characters/starter", get(profile::starter_characters))
        .route("/characters/choose", post(profile::choose_character))
        .route("/wallet", get(wallet::get_wallet))
        .route("/wallet/history", get(wallet::history))
        .route("/shop/characters", get(shop::characters))
        .route("/shop/foods", get(shop::foods))
        .route("/shop/inventory", get(shop::inventory))
        .route("/shop/buy", post(shop::buy))
        .route("/missions/today", get(missions::today))
        .route("/missions/log-expense", post(missions::log_expense))
        .route("/missions/log-saving", post(missions::log_saving))
        .route("/missions/expenses", get(missions::expenses))
        .route("/missions/savings", get(missions::savings))
        .route("/tamagotchi", get(tamagotchi::get_state))
        .route("/tamagotchi/feed", post(tamagotchi::feed))
        .route("/tamagotchi/rename", post(tamagotchi::rename))
        .route("/goals", post(goals::create).get(goals::list_all))
        .route("/goals/active", get(goals::list_active))
        .route("/goals/completed", get(goals::list_completed))
        .route("/goals/{id}/progress", post(goals::add_progress))
        .route("/goals/{id}", delete(goals::remove))
        .route("/adventure/generate", post(adventure::generate))
        .route("/adventure/submit-choice", post(adventure::submit_choice))
        .route("/adventure", get(adventure::history))
        .route("/adventure/{id}", get(adventure::get_one))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = public.merge(protected);
    let app = if api_prefix.is_empty() || api_prefix == "/" {
        api
    } else {
        Router::new().nest(api_prefix, api)
    };
    app.layer(cors).with_state(state)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiSettings;
    use crate::core::adventure::AdventureService;
    use crate::core::auth::AuthService;
    use crate::core::goal::GoalService;
    use crate::core::mission::MissionService;
    use crate::core::profile::ProfileService;
    use crate::core::shop::ShopService;
    use crate::core::tamagotchi::TamagotchiService;
    use crate::core::wallet::WalletService;
    use crate::infra::adventure::PgAdventureStore;
    use crate::infra::ai::AdventureApiClient;
    use crate::infra::auth::PgUserStore;
    use crate::infra::goal::PgGoalStore;
    use crate::infra::mission::PgMissionStore;
    use crate::infra::profile::PgProfileStore;
    use crate::infra::shop::PgShopStore;
    use crate::infra::tamagotchi::PgTamagotchiStore;
    use crate::infra::wallet::PgWalletStore;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
    use std::sync::Arc;
    use std::time::Duration;

    /// State over a lazy pool: nothing here actually reaches a database, so
    /// the tests can exercise routing and the gate without one.
    fn test_state() -> AppState {
        let options = PgConnectOptions::new().host("127.0.0.1").database("unused");
        let pool = PgPoolOptions::new().connect_lazy_with(options);
        let ai = AdventureApiClient::new(AiSettings {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(1),
            max_retries: 1,
            retry_delay: Duration::from_millis(1),
        })
        .unwrap();

        AppState {
            auth: Arc::new(AuthService::new(
                PgUserStore::new(pool.clone()),
                "test-secret",
                3600,
            )),
            profiles: Arc::new(ProfileService::new(PgProfileStore::new(pool.clone()))),
            wallets: Arc::new(WalletService::new(PgWalletStore::new(pool.clone()))),
            shop: Arc::new(ShopService::new(PgShopStore::new(pool.clone()))),
            missions: Arc::new(MissionService::new(PgMissionStore::new(pool.clone()))),
            tamagotchi: Arc::new(TamagotchiService::new(PgTamagotchiStore::new(pool.clone()))),
            goals: Arc::new(GoalService::new(PgGoalStore::new(pool.clone()))),
            adventures: Arc::new(AdventureService::new(
                PgAdventureStore::new(pool.clone()),
                ai,
                PgProfileStore::new(pool.clone()),
                PgGoalStore::new(pool),
            )),
        }
    }

    async fn spawn_app() -> String {
        let app = build(test_state(), "/api", CorsLayer::new());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        base
    }

    #[tokio::test]
    async fn health_is_reachable_without_auth() {
        let base = spawn_app().await;
        let response = reqwest::get(format!("{}/api/health", base)).await.unwrap();
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_and_bad_tokens() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!("{}/api/wallet", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["statusCode"], 401);
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["path"], "/api/wallet");
        assert!(body["timestamp"].is_string());

        let response = client
            .get(format!("{}/api/goals", base))
            .header("Authorization", "Bearer not-a-real-token")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401);
    }
}
