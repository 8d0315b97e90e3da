// PostgreSQL implementation of the TamagotchiStore trait.
//
// Feed is one transaction: pet row locked, meal math applied, one food
// consumed from the locked inventory row, care-mission progress bumped via
// the mission store helper.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::core::error::GameError;
use crate::core::mission::{Mission, FEED_COUNT};
use crate::core::shop::Food;
use crate::core::tamagotchi::{apply_meal, FeedOutcome, Tamagotchi, TamagotchiStore};
use crate::infra::db::db_err;
use crate::infra::mission::bump_user_mission;

pub struct PgTamagotchiStore {
    pool: PgPool,
}

impl PgTamagotchiStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn tamagotchi_from_row(row: &PgRow) -> Tamagotchi {
    Tamagotchi {
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
    }
}

const SELECT_COLUMNS: &str =
    "id, user_id, character_id, name, hunger, happiness, health, last_fed_at, created_at, updated_at";

#[async_trait]
impl TamagotchiStore for PgTamagotchiStore {
    async fn find(&self, user_id: Uuid) -> Result<Option<Tamagotchi>, GameError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM tamagotchis WHERE user_id = $1",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.as_ref().map(tamagotchi_from_row))
    }

    async fn feed(
        &self,
        user_id: Uuid,
        food: &Food,
        care_mission: Option<&Mission>,
    ) -> Result<FeedOutcome, GameError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM tamagotchis WHERE user_id = $1 FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        let Some(row) = row else {
            return Err(GameError::NotFound("tamagotchi"));
        };
        let pet = tamagotchi_from_row(&row);

        let inventory = sqlx::query(
            "SELECT id, quantity FROM user_inventory \
             WHERE user_id = $1 AND item_type = 'food' AND item_id = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(food.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        let Some(inventory) = inventory else {
            return Err(GameError::Forbidden(
                "food is not in the user's inventory".to_string(),
            ));
        };

        let (hunger, happiness, health) =
            apply_meal(pet.hunger, pet.happiness, pet.health, food.nutrition_value);
        let row = sqlx::query(&format!(
            "UPDATE tamagotchis \
             SET hunger = $2, happiness = $3, health = $4, last_fed_at = now(), updated_at = now() \
             WHERE id = $1 RETURNING {}",
            SELECT_COLUMNS
        ))
        .bind(pet.id)
        .bind(hunger)
        .bind(happiness)
        .bind(health)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let tamagotchi = tamagotchi_from_row(&row);

        let entry_id: Uuid = inventory.get("id");
        let quantity: i32 = inventory.get("quantity");
        if quantity <= 1 {
            sqlx::query("DELETE FROM user_inventory WHERE id = $1")
                .bind(entry_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        } else {
            sqlx::query("UPDATE user_inventory SET quantity = quantity - 1 WHERE id = $1")
                .bind(entry_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        let mission_progress = match care_mission {
            Some(mission) => {
                Some(bump_user_mission(&mut *tx, user_id, mission, FEED_COUNT).await?)
            }
            None => None,
        };

        tx.commit().await.map_err(db_err)?;
        Ok(FeedOutcome {
            tamagotchi,
            mission_progress,
        })
    }

    async fn rename(&self, user_id: Uuid, name: &str) -> Result<Tamagotchi, GameError> {
        let row = sqlx::query(&format!(
            "UPDATE tamagotchis SET name = $2, updated_at = now() \
             WHERE user_id = $1 RETURNING {}",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref()
            .map(tamagotchi_from_row)
            .ok_or(GameError::NotFound("tamagotchi"))
    }
}
