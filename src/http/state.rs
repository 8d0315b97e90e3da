// Shared handler state: one Arc per service, filled in by the composition
// root in main.

use std::sync::Arc;
use uuid::Uuid;

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

pub type AppAuthService = AuthService<PgUserStore>;
pub type AppProfileService = ProfileService<PgProfileStore>;
pub type AppWalletService = WalletService<PgWalletStore>;
pub type AppShopService = ShopService<PgShopStore>;
pub type AppMissionService = MissionService<PgMissionStore>;
pub type AppTamagotchiService = TamagotchiService<PgTamagotchiStore>;
pub type AppGoalService = GoalService<PgGoalStore>;
pub type AppAdventureService =
    AdventureService<PgAdventureStore, AdventureApiClient, PgProfileStore, PgGoalStore>;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AppAuthService>,
    pub profiles: Arc<AppProfileService>,
    pub wallets: Arc<AppWalletService>,
    pub shop: Arc<AppShopService>,
    pub missions: Arc<AppMissionService>,
    pub tamagotchi: Arc<AppTamagotchiService>,
    pub goals: Arc<AppGoalService>,
    pub adventures: Arc<AppAdventureService>,
}

/// Authenticated principal, attached to request extensions by the auth gate.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);
