// The infra module contains implementations of core traits.
// Each engine's PostgreSQL store goes in its own submodule; `db` owns the
// pool and schema, `ai` the outbound adventure-service client.

pub mod db;

#[path = "auth/pg_user_store.rs"]
pub mod auth;

#[path = "wallet/pg_wallet_store.rs"]
pub mod wallet;

#[path = "shop/pg_shop_store.rs"]
pub mod shop;

#[path = "mission/pg_mission_store.rs"]
pub mod mission;

#[path = "tamagotchi/pg_tamagotchi_store.rs"]
pub mod tamagotchi;

#[path = "goal/pg_goal_store.rs"]
pub mod goal;

#[path = "profile/pg_profile_store.rs"]
pub mod profile;

#[path = "adventure/pg_adventure_store.rs"]
pub mod adventure;

#[path = "ai/adventure_api_client.rs"]
pub mod ai;
