// Profile engine - player profiles and the onboarding hand-off.
//
// Choosing a starter character is the one-shot bootstrap: it creates the
// tamagotchi, flips `onboarding_completed` and seeds the starting food, all
// in one storage transaction. A second attempt conflicts on the existing pet.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::error::{FieldError, GameError};
use super::shop::Character;
use super::tamagotchi::Tamagotchi;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

pub const MIN_AGE: i32 = 5;
pub const MAX_AGE: i32 = 18;
pub const DEFAULT_CURRENCY: &str = "IDR";

/// Initial vitals for a freshly adopted pet.
pub const STARTER_HUNGER: i32 = 50;
pub const STARTER_HAPPINESS: i32 = 50;
pub const STARTER_HEALTH: i32 = 100;

/// Units of the cheapest catalog food granted on onboarding.
pub const STARTER_FOOD_QUANTITY: i32 = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub age: i32,
    pub allowance: Decimal,
    pub currency: String,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What choosing a starter hands back.
#[derive(Debug, Clone)]
pub struct StarterOutcome {
    pub tamagotchi: Tamagotchi,
    pub character: Character,
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert a new profile; `Conflict` when the user already has one.
    async fn insert(&self, profile: Profile) -> Result<Profile, GameError>;

    async fn find(&self, user_id: Uuid) -> Result<Option<Profile>, GameError>;

    /// One transaction: create the tamagotchi named after the character with
    /// the starter vitals, flip `onboarding_completed`, and grant the
    /// starting food. `Conflict` when a tamagotchi already exists,
    /// `NotFound` when the user has no profile yet.
    async fn adopt_starter(
        &self,
        user_id: Uuid,
        character: &Character,
    ) -> Result<Tamagotchi, GameError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ProfileService<S: ProfileStore> {
    store: S,
}

impl<S: ProfileStore> ProfileService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create_profile(
        &self,
        user_id: Uuid,
        age: i32,
        allowance: Decimal,
        currency: Option<&str>,
    ) -> Result<Profile, GameError> {
        let mut errors = Vec::new();
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            errors.push(FieldError::new(
                "age",
                format!("age must be between {} and {}", MIN_AGE, MAX_AGE),
            ));
        }
        let currency = currency.unwrap_or(DEFAULT_CURRENCY).trim().to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.push(FieldError::new("currency", "currency must be a 3-letter code"));
        }
        if !errors.is_empty() {
            return Err(GameError::ValidationFailed(errors));
        }
        if allowance <= Decimal::ZERO {
            return Err(GameError::InvalidAmount(format!(
                "allowance must be positive, got {}",
                allowance
            )));
        }

        let now = Utc::now();
        self.store
            .insert(Profile {
                id: Uuid::new_v4(),
                user_id,
                age,
                allowance,
                currency,
                onboarding_completed: false,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Profile, GameError> {
        self.store
            .find(user_id)
            .await?
            .ok_or(GameError::NotFound("profile"))
    }

    /// Pick the starter character and bootstrap the pet.
    pub async fn choose_starter(
        &self,
        user_id: Uuid,
        character: Character,
    ) -> Result<StarterOutcome, GameError> {
        if !character.is_starter {
            return Err(GameError::InvalidStarter);
        }
        let tamagotchi = self.store.adopt_starter(user_id, &character).await?;
        tracing::info!(
            user_id = %user_id,
            character = %character.name,
            "onboarding completed, starter adopted"
        );
        Ok(StarterOutcome {
            tamagotchi,
            character,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::shop::tests::character;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    pub(crate) struct InMemoryProfileStore {
        pub profiles: Arc<Mutex<HashMap<Uuid, Profile>>>,
        pub pets: Arc<Mutex<HashMap<Uuid, Tamagotchi>>>,
        pub granted_food: Arc<Mutex<Vec<(Uuid, i32)>>>,
    }

    impl InMemoryProfileStore {
        pub fn new() -> Self {
            Self {
                profiles: Arc::new(Mutex::new(HashMap::new())),
                pets: Arc::new(Mutex::new(HashMap::new())),
                granted_food: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl ProfileStore for InMemoryProfileStore {
        async fn insert(&self, profile: Profile) -> Result<Profile, GameError> {
            let mut profiles = self.profiles.lock().unwrap();
            if profiles.contains_key(&profile.user_id) {
                return Err(GameError::Conflict("profile already exists".to_string()));
            }
            profiles.insert(profile.user_id, profile.clone());
            Ok(profile)
        }

        async fn find(&self, user_id: Uuid) -> Result<Option<Profile>, GameError> {
            Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
        }

        async fn adopt_starter(
            &self,
            user_id: Uuid,
            character: &Character,
        ) -> Result<Tamagotchi, GameError> {
            let mut profiles = self.profiles.lock().unwrap();
            let profile = profiles
                .get_mut(&user_id)
                .ok_or(GameError::NotFound("profile"))?;

            let mut pets = self.pets.lock().unwrap();
            if pets.contains_key(&user_id) {
                return Err(GameError::Conflict("tamagotchi already exists".to_string()));
            }

            let now = Utc::now();
            let pet = Tamagotchi {
                id: Uuid::new_v4(),
                user_id,
                character_id: character.id,
                name: character.name.clone(),
                hunger: STARTER_HUNGER,
                happiness: STARTER_HAPPINESS,
                health: STARTER_HEALTH,
                last_fed_at: None,
                created_at: now,
                updated_at: now,
            };
            pets.insert(user_id, pet.clone());
            profile.onboarding_completed = true;
            profile.updated_at = now;
            self.granted_food
                .lock()
                .unwrap()
                .push((user_id, STARTER_FOOD_QUANTITY));
            Ok(pet)
        }
    }

    fn service() -> ProfileService<InMemoryProfileStore> {
        ProfileService::new(InMemoryProfileStore::new())
    }

    #[tokio::test]
    async fn create_profile_defaults_currency_and_rejects_duplicates() {
        let service = service();
        let user = Uuid::new_v4();

        let profile = service
            .create_profile(user, 10, dec!(70000), None)
            .await
            .unwrap();
        assert_eq!(profile.currency, "IDR");
        assert!(!profile.onboarding_completed);

        let err = service
            .create_profile(user, 10, dec!(70000), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::Conflict(_)));
    }

    #[tokio::test]
    async fn profile_validation_catches_age_and_currency() {
        let service = service();
        let user = Uuid::new_v4();

        let err = service
            .create_profile(user, 4, dec!(10), Some("EURO"))
            .await
            .unwrap_err();
        let GameError::ValidationFailed(fields) = err else {
            panic!("expected validation failure");
        };
        let named: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
        assert!(named.contains(&"age"));
        assert!(named.contains(&"currency"));

        let err = service
            .create_profile(user, 10, dec!(0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn choosing_a_starter_bootstraps_the_pet() {
        let service = service();
        let user = Uuid::new_v4();
        service
            .create_profile(user, 10, dec!(70000), None)
            .await
            .unwrap();

        let starter = character("Foxy", dec!(0), true);
        let outcome = service.choose_starter(user, starter).await.unwrap();
        assert_eq!(outcome.tamagotchi.hunger, STARTER_HUNGER);
        assert_eq!(outcome.tamagotchi.happiness, STARTER_HAPPINESS);
        assert_eq!(outcome.tamagotchi.health, STARTER_HEALTH);
        assert_eq!(outcome.tamagotchi.name, "Foxy");

        let profile = service.get_profile(user).await.unwrap();
        assert!(profile.onboarding_completed);
        assert_eq!(
            service.store.granted_food.lock().unwrap().as_slice(),
            &[(user, STARTER_FOOD_QUANTITY)]
        );
    }

    #[tokio::test]
    async fn non_starter_characters_are_rejected() {
        let service = service();
        let user = Uuid::new_v4();
        service
            .create_profile(user, 10, dec!(70000), None)
            .await
            .unwrap();

        let premium = character("Dragon", dec!(100), false);
        let err = service.choose_starter(user, premium).await.unwrap_err();
        assert!(matches!(err, GameError::InvalidStarter));
    }

    #[tokio::test]
    async fn second_starter_choice_conflicts() {
        let service = service();
        let user = Uuid::new_v4();
        service
            .create_profile(user, 10, dec!(70000), None)
            .await
            .unwrap();

        service
            .choose_starter(user, character("Foxy", dec!(0), true))
            .await
            .unwrap();
        let err = service
            .choose_starter(user, character("Bunny", dec!(0), true))
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::Conflict(_)));
    }
}
