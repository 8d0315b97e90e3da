// Tamagotchi engine - pet state and the feed transaction.
//
// Feeding consumes one food from the inventory, applies the meal math to the
// stats and bumps an active care mission, all inside one storage transaction.
// Stats are integers clamped to [0, 100]; the storage layer backs that with
// CHECK constraints.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::error::GameError;
use super::mission::{Mission, MissionKind, ProgressUpdate};
use super::shop::Food;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// A user's pet. Exactly one exists per user once onboarding finishes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tamagotchi {
    pub id: Uuid,
    pub user_id: Uuid,
    pub character_id: Uuid,
    pub name: String,
    pub hunger: i32,
    pub happiness: i32,
    pub health: i32,
    pub last_fed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a feed: the updated pet plus whatever an active care mission
/// did with the bump.
#[derive(Debug, Clone)]
pub struct FeedOutcome {
    pub tamagotchi: Tamagotchi,
    pub mission_progress: Option<ProgressUpdate>,
}

// ============================================================================
// FEED RULES
// ============================================================================

/// Hunger below this threshold lets the pet recover health when fed.
const HEALTHY_HUNGER: i32 = 30;
const HEALTH_RECOVERY: i32 = 5;

/// Stat arithmetic for one meal. Pure so stores apply it inside their
/// transactions and tests can pin the boundary behavior.
///
/// Hunger drops by the food's nutrition (floored at 0), happiness rises by
/// half the nutrition (capped at 100), and a well-fed pet recovers a little
/// health.
pub fn apply_meal(hunger: i32, happiness: i32, health: i32, nutrition: i32) -> (i32, i32, i32) {
    let hunger_after = (hunger - nutrition).max(0);
    let happiness_after = (happiness + nutrition / 2).min(100);
    let health_after = if hunger_after < HEALTHY_HUNGER {
        (health + HEALTH_RECOVERY).min(100)
    } else {
        health
    };
    (hunger_after, happiness_after, health_after)
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

#[async_trait]
pub trait TamagotchiStore: Send + Sync {
    async fn find(&self, user_id: Uuid) -> Result<Option<Tamagotchi>, GameError>;

    /// One transaction: verify the user owns the food (`Forbidden` when not),
    /// apply the meal, stamp `last_fed_at`, consume one unit from the
    /// inventory and bump the care mission when one is supplied.
    async fn feed(
        &self,
        user_id: Uuid,
        food: &Food,
        care_mission: Option<&Mission>,
    ) -> Result<FeedOutcome, GameError>;

    async fn rename(&self, user_id: Uuid, name: &str) -> Result<Tamagotchi, GameError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct TamagotchiService<S: TamagotchiStore> {
    store: S,
}

impl<S: TamagotchiStore> TamagotchiService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Tamagotchi, GameError> {
        self.store
            .find(user_id)
            .await?
            .ok_or(GameError::NotFound("tamagotchi"))
    }

    /// Feed the pet one unit of `food`. `active_mission` is whatever mission
    /// is current today; only a care mission makes it into the transaction.
    pub async fn feed(
        &self,
        user_id: Uuid,
        food: &Food,
        active_mission: Option<&Mission>,
    ) -> Result<FeedOutcome, GameError> {
        let care_mission =
            active_mission.filter(|m| m.kind == MissionKind::TamagotchiCare);
        let outcome = self.store.feed(user_id, food, care_mission).await?;
        if let Some(update) = &outcome.mission_progress {
            tracing::debug!(
                progress_pct = update.progress_pct,
                completed = update.completed,
                "care mission progressed"
            );
        }
        tracing::debug!(
            user_id = %user_id,
            food = %food.name,
            hunger = outcome.tamagotchi.hunger,
            happiness = outcome.tamagotchi.happiness,
            health = outcome.tamagotchi.health,
            "tamagotchi fed"
        );
        Ok(outcome)
    }

    pub async fn rename(&self, user_id: Uuid, name: &str) -> Result<Tamagotchi, GameError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > 50 {
            return Err(GameError::ValidationFailed(vec![
                super::error::FieldError::new("name", "name must be 1-50 characters"),
            ]));
        }
        self.store.rename(user_id, name).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::mission::tests::InMemoryMissionStore;
    use crate::core::mission::FEED_COUNT;
    use crate::core::shop::tests::{food, InMemoryShopStore};
    use crate::core::shop::{ItemKind, ShopStore};
    use std::sync::{Arc, Mutex};

    pub(crate) fn hatchling(user_id: Uuid) -> Tamagotchi {
        Tamagotchi {
            id: Uuid::new_v4(),
            user_id,
            character_id: Uuid::new_v4(),
            name: "Foxy".to_string(),
            hunger: 50,
            happiness: 50,
            health: 100,
            last_fed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// In-memory store wired to the in-memory shop (for inventory) and
    /// mission (for care bumps) stores, mirroring the real transaction.
    pub(crate) struct InMemoryTamagotchiStore {
        pub pets: Arc<Mutex<Vec<Tamagotchi>>>,
        pub shop: InMemoryShopStore,
        pub missions: InMemoryMissionStore,
    }

    impl InMemoryTamagotchiStore {
        pub fn new(pets: Vec<Tamagotchi>) -> Self {
            Self {
                pets: Arc::new(Mutex::new(pets)),
                shop: InMemoryShopStore::new(vec![], vec![]),
                missions: InMemoryMissionStore::new(None),
            }
        }
    }

    #[async_trait]
    impl TamagotchiStore for InMemoryTamagotchiStore {
        async fn find(&self, user_id: Uuid) -> Result<Option<Tamagotchi>, GameError> {
            Ok(self
                .pets
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.user_id == user_id)
                .cloned())
        }

        async fn feed(
            &self,
            user_id: Uuid,
            food: &Food,
            care_mission: Option<&Mission>,
        ) -> Result<FeedOutcome, GameError> {
            if self.find(user_id).await?.is_none() {
                return Err(GameError::NotFound("tamagotchi"));
            }
            if !self.shop.owns(user_id, ItemKind::Food, food.id).await? {
                return Err(GameError::Forbidden(
                    "food is not in the user's inventory".to_string(),
                ));
            }

            let tamagotchi = {
                let mut pets = self.pets.lock().unwrap();
                let pet = pets
                    .iter_mut()
                    .find(|p| p.user_id == user_id)
                    .expect("checked above");
                let (hunger, happiness, health) =
                    apply_meal(pet.hunger, pet.happiness, pet.health, food.nutrition_value);
                pet.hunger = hunger;
                pet.happiness = happiness;
                pet.health = health;
                pet.last_fed_at = Some(Utc::now());
                pet.updated_at = Utc::now();
                pet.clone()
            };

            self.shop.consume(user_id, ItemKind::Food, food.id, 1).await?;
            let mission_progress =
                care_mission.map(|m| self.missions.apply_bump(user_id, m, FEED_COUNT));
            Ok(FeedOutcome {
                tamagotchi,
                mission_progress,
            })
        }

        async fn rename(&self, user_id: Uuid, name: &str) -> Result<Tamagotchi, GameError> {
            let mut pets = self.pets.lock().unwrap();
            let pet = pets
                .iter_mut()
                .find(|p| p.user_id == user_id)
                .ok_or(GameError::NotFound("tamagotchi"))?;
            pet.name = name.to_string();
            pet.updated_at = Utc::now();
            Ok(pet.clone())
        }
    }

    #[test]
    fn meal_math_matches_the_feed_rules() {
        // Nominal: 50 hunger, nutrition 10.
        assert_eq!(apply_meal(50, 50, 100, 10), (40, 55, 100));
        // Hunger floors at zero and still raises happiness.
        assert_eq!(apply_meal(0, 80, 90, 8), (0, 84, 95));
        // Dropping below the threshold recovers health, capped at 100.
        assert_eq!(apply_meal(35, 100, 98, 10), (25, 100, 100));
        // Odd nutrition halves by flooring.
        assert_eq!(apply_meal(60, 10, 50, 7), (53, 13, 50));
    }

    #[tokio::test]
    async fn feed_updates_stats_and_consumes_inventory() {
        let user = Uuid::new_v4();
        let apple = food("Apple", 10, rust_decimal_macros::dec!(5));
        let store = InMemoryTamagotchiStore::new(vec![hatchling(user)]);
        store.shop.grant(user, ItemKind::Food, apple.id, 10);
        let service = TamagotchiService::new(store);

        let outcome = service.feed(user, &apple, None).await.unwrap();
        assert_eq!(outcome.tamagotchi.hunger, 40);
        assert_eq!(outcome.tamagotchi.happiness, 55);
        assert_eq!(outcome.tamagotchi.health, 100);
        assert!(outcome.tamagotchi.last_fed_at.is_some());

        let inventory = service.store.shop.inventory(user).await.unwrap();
        assert_eq!(inventory[0].quantity, 9);
    }

    #[tokio::test]
    async fn feeding_unowned_food_is_forbidden() {
        let user = Uuid::new_v4();
        let apple = food("Apple", 10, rust_decimal_macros::dec!(5));
        let store = InMemoryTamagotchiStore::new(vec![hatchling(user)]);
        let service = TamagotchiService::new(store);

        let err = service.feed(user, &apple, None).await.unwrap_err();
        assert!(matches!(err, GameError::Forbidden(_)));
    }

    #[tokio::test]
    async fn feeding_without_a_pet_is_not_found() {
        let apple = food("Apple", 10, rust_decimal_macros::dec!(5));
        let service = TamagotchiService::new(InMemoryTamagotchiStore::new(vec![]));
        let err = service.feed(Uuid::new_v4(), &apple, None).await.unwrap_err();
        assert!(matches!(err, GameError::NotFound("tamagotchi")));
    }

    #[tokio::test]
    async fn feed_bumps_care_mission_but_ignores_other_kinds() {
        let user = Uuid::new_v4();
        let apple = food("Apple", 10, rust_decimal_macros::dec!(5));
        let store = InMemoryTamagotchiStore::new(vec![hatchling(user)]);
        store.shop.grant(user, ItemKind::Food, apple.id, 5);
        let service = TamagotchiService::new(store);

        let care = crate::core::mission::tests::mission(
            MissionKind::TamagotchiCare,
            &[(FEED_COUNT, 2)],
        );
        let outcome = service.feed(user, &apple, Some(&care)).await.unwrap();
        let update = outcome.mission_progress.unwrap();
        assert_eq!(update.progress_pct, 50.0);
        assert!(!update.completed);

        let unrelated = crate::core::mission::tests::mission(
            MissionKind::LogExpenses,
            &[(crate::core::mission::EXPENSE_COUNT, 1)],
        );
        let outcome = service.feed(user, &apple, Some(&unrelated)).await.unwrap();
        assert!(outcome.mission_progress.is_none());
    }

    #[tokio::test]
    async fn rename_validates_length() {
        let user = Uuid::new_v4();
        let service = TamagotchiService::new(InMemoryTamagotchiStore::new(vec![hatchling(user)]));

        let renamed = service.rename(user, "Blaze").await.unwrap();
        assert_eq!(renamed.name, "Blaze");

        let err = service.rename(user, "   ").await.unwrap_err();
        assert!(matches!(err, GameError::ValidationFailed(_)));
        let err = service.rename(user, &"x".repeat(51)).await.unwrap_err();
        assert!(matches!(err, GameError::ValidationFailed(_)));
    }
}
