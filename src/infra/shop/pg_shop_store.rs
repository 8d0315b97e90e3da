// PostgreSQL implementation of the ShopStore trait.
//
// Purchase runs the wallet debit and the inventory upsert in one
// transaction; the upsert keeps character ownership binary while foods
// stack.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::core::error::GameError;
use crate::core::shop::{
    Character, Food, InventoryEntry, ItemKind, ShopItem, ShopStore,
};
use crate::core::wallet::TransactionType;
use crate::infra::db::db_err;
use crate::infra::wallet::apply_signed;

pub struct PgShopStore {
    pool: PgPool,
}

impl PgShopStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn character_from_row(row: &PgRow) -> Character {
    Character {
        id: row.get("id"),
        name: row.get("name"),
        image_url: row.get("image_url"),
        is_starter: row.get("is_starter"),
        price: row.get("price"),
    }
}

fn food_from_row(row: &PgRow) -> Food {
    Food {
        id: row.get("id"),
        name: row.get("name"),
        nutrition_value: row.get("nutrition_value"),
        price: row.get("price"),
        image_url: row.get("image_url"),
    }
}

fn entry_from_row(row: &PgRow) -> Result<InventoryEntry, GameError> {
    let tag: String = row.get("item_type");
    let item_kind = ItemKind::parse(&tag)
        .ok_or_else(|| GameError::Internal(format!("unknown inventory item type: {}", tag)))?;
    Ok(InventoryEntry {
        id: row.get("id"),
        user_id: row.get("user_id"),
        item_kind,
        item_id: row.get("item_id"),
        quantity: row.get("quantity"),
        acquired_at: row.get("acquired_at"),
    })
}

#[async_trait]
impl ShopStore for PgShopStore {
    async fn characters(&self) -> Result<Vec<Character>, GameError> {
        let rows = sqlx::query(
            "SELECT id, name, image_url, is_starter, price FROM characters \
             ORDER BY price ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.iter().map(character_from_row).collect())
    }

    async fn starter_characters(&self) -> Result<Vec<Character>, GameError> {
        let rows = sqlx::query(
            "SELECT id, name, image_url, is_starter, price FROM characters \
             WHERE is_starter ORDER BY price ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.iter().map(character_from_row).collect())
    }

    async fn foods(&self) -> Result<Vec<Food>, GameError> {
        let rows = sqlx::query(
            "SELECT id, name, nutrition_value, price, image_url FROM foods \
             ORDER BY price ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.iter().map(food_from_row).collect())
    }

    async fn character(&self, id: Uuid) -> Result<Option<Character>, GameError> {
        let row = sqlx::query(
            "SELECT id, name, image_url, is_starter, price FROM characters WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.as_ref().map(character_from_row))
    }

    async fn food(&self, id: Uuid) -> Result<Option<Food>, GameError> {
        let row = sqlx::query(
            "SELECT id, name, nutrition_value, price, image_url FROM foods WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.as_ref().map(food_from_row))
    }

    async fn inventory(&self, user_id: Uuid) -> Result<Vec<InventoryEntry>, GameError> {
        let rows = sqlx::query(
            "SELECT id, user_id, item_type, item_id, quantity, acquired_at \
             FROM user_inventory WHERE user_id = $1 ORDER BY acquired_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn owns(
        &self,
        user_id: Uuid,
        kind: ItemKind,
        item_id: Uuid,
    ) -> Result<bool, GameError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM user_inventory \
             WHERE user_id = $1 AND item_type = $2 AND item_id = $3) AS owned",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(item_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.get("owned"))
    }

    async fn purchase(
        &self,
        user_id: Uuid,
        item: &ShopItem,
        description: &str,
    ) -> Result<Decimal, GameError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let wallet = apply_signed(
            &mut *tx,
            user_id,
            -item.price(),
            TransactionType::ShopPurchase,
            Some(description),
        )
        .await?;

        let upsert = match item.kind() {
            ItemKind::Food => {
                "INSERT INTO user_inventory (id, user_id, item_type, item_id, quantity) \
                 VALUES ($1, $2, $3, $4, 1) \
                 ON CONFLICT (user_id, item_type, item_id) \
                 DO UPDATE SET quantity = user_inventory.quantity + 1"
            }
            ItemKind::Character => {
                "INSERT INTO user_inventory (id, user_id, item_type, item_id, quantity) \
                 VALUES ($1, $2, $3, $4, 1) \
                 ON CONFLICT (user_id, item_type, item_id) DO NOTHING"
            }
        };
        sqlx::query(upsert)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(item.kind().as_str())
            .bind(item.id())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(wallet.balance)
    }

    async fn consume(
        &self,
        user_id: Uuid,
        kind: ItemKind,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<(), GameError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query(
            "SELECT id, quantity FROM user_inventory \
             WHERE user_id = $1 AND item_type = $2 AND item_id = $3 FOR UPDATE",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        let Some(row) = row else {
            return Err(GameError::NotFound("inventory item"));
        };

        let available: i32 = row.get("quantity");
        if available < quantity {
            return Err(GameError::InsufficientQuantity {
                required: quantity,
                available,
            });
        }

        let entry_id: Uuid = row.get("id");
        if available == quantity {
            sqlx::query("DELETE FROM user_inventory WHERE id = $1")
                .bind(entry_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        } else {
            sqlx::query("UPDATE user_inventory SET quantity = quantity - $2 WHERE id = $1")
                .bind(entry_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
