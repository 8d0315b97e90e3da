// PostgreSQL implementation of the ProfileStore trait.
//
// `adopt_starter` is the onboarding transaction: pet created, profile
// flipped, starter food granted, together or not at all.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::core::error::GameError;
use crate::core::profile::{
    Profile, ProfileStore, STARTER_FOOD_QUANTITY, STARTER_HAPPINESS, STARTER_HEALTH,
    STARTER_HUNGER,
};
use crate::core::shop::{Character, ItemKind};
use crate::core::tamagotchi::Tamagotchi;
use crate::infra::db::db_err;

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn profile_from_row(row: &PgRow) -> Profile {
    Profile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        age: row.get("age"),
        allowance: row.get("allowance"),
        currency: row.get::<String, _>("currency").trim().to_string(),
        onboarding_completed: row.get("onboarding_completed"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn insert(&self, profile: Profile) -> Result<Profile, GameError> {
        sqlx::query(
            "INSERT INTO profiles (id, user_id, age, allowance, currency, onboarding_completed, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(profile.id)
        .bind(profile.user_id)
        .bind(profile.age)
        .bind(profile.allowance)
        .bind(&profile.currency)
        .bind(profile.onboarding_completed)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match db_err(err) {
            GameError::Conflict(_) => {
                GameError::Conflict("profile already exists for this user".to_string())
            }
            other => other,
        })?;
        Ok(profile)
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<Profile>, GameError> {
        let row = sqlx::query(
            "SELECT id, user_id, age, allowance, currency, onboarding_completed, created_at, \
             updated_at FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.as_ref().map(profile_from_row))
    }

    async fn adopt_starter(
        &self,
        user_id: Uuid,
        character: &Character,
    ) -> Result<Tamagotchi, GameError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let profile = sqlx::query("SELECT id FROM profiles WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if profile.is_none() {
            return Err(GameError::NotFound("profile"));
        }

        let existing = sqlx::query("SELECT 1 FROM tamagotchis WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            return Err(GameError::Conflict(
                "a tamagotchi already exists for this user".to_string(),
            ));
        }

        let row = sqlx::query(
            "INSERT INTO tamagotchis (id, user_id, character_id, name, hunger, happiness, health) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, user_id, character_id, name, hunger, happiness, health, last_fed_at, \
             created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(character.id)
        .bind(&character.name)
        .bind(STARTER_HUNGER)
        .bind(STARTER_HAPPINESS)
        .bind(STARTER_HEALTH)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let tamagotchi = Tamagotchi {
            id: row.get("id"),
            user_id: row.get("user_id"),
            character_id: row.get("character_id"),
            name: row.get("name"),
            hunger: row.get("hunger"),
            happiness: row.get("happiness"),
            health: row.get("health"),
            last_fed_at: row.get("last_fed_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        };

        sqlx::query(
            "UPDATE profiles SET onboarding_completed = TRUE, updated_at = now() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        // Starting rations: a stack of the cheapest catalog food.
        let starter_food = sqlx::query("SELECT id FROM foods ORDER BY price ASC, name ASC LIMIT 1")
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if let Some(food) = starter_food {
            sqlx::query(
                "INSERT INTO user_inventory (id, user_id, item_type, item_id, quantity) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (user_id, item_type, item_id) \
                 DO UPDATE SET quantity = user_inventory.quantity + EXCLUDED.quantity",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(ItemKind::Food.as_str())
            .bind(food.get::<Uuid, _>("id"))
            .bind(STARTER_FOOD_QUANTITY)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(tamagotchi)
    }
}
