// The http module is the axum boundary: router, auth gate, JSON handlers
// and the uniform error envelope. No business logic lives here - handlers
// validate shape, call the core services and shape responses.

#[path = "state.rs"]
pub mod state;

#[path = "error.rs"]
pub mod error;

#[path = "auth_gate.rs"]
pub mod auth_gate;

#[path = "router.rs"]
pub mod router;

#[path = "handlers/auth.rs"]
pub mod auth;

#[path = "handlers/profile.rs"]
pub mod profile;

#[path = "handlers/wallet.rs"]
pub mod wallet;

#[path = "handlers/shop.rs"]
pub mod shop;

#[path = "handlers/missions.rs"]
pub mod missions;

#[path = "handlers/tamagotchi.rs"]
pub mod tamagotchi;

#[path = "handlers/goals.rs"]
pub mod goals;

#[path = "handlers/adventure.rs"]
pub mod adventure;
