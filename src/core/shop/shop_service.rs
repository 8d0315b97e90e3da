// Shop engine - catalog reads, purchases and the user inventory.
//
// Characters and foods share one inventory table behind a kind discriminator.
// The invariant the store has to keep: character ownership is binary, food
// ownership is a stacked quantity, and a quantity that reaches zero deletes
// the row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::GameError;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Catalog character. Seeded externally; read-mostly.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub is_starter: bool,
    pub price: Decimal,
}

/// Catalog food. `nutrition_value` drives the tamagotchi feed math.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    pub id: Uuid,
    pub name: String,
    pub nutrition_value: i32,
    pub price: Decimal,
    pub image_url: Option<String>,
}

/// Discriminator for the two item kinds sharing the inventory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Character,
    Food,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Character => "character",
            ItemKind::Food => "food",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "character" => Some(ItemKind::Character),
            "food" => Some(ItemKind::Food),
            _ => None,
        }
    }
}

/// One owned stack in a user's inventory. At most one row exists per
/// `(user, kind, item)`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_kind: ItemKind,
    pub item_id: Uuid,
    pub quantity: i32,
    pub acquired_at: DateTime<Utc>,
}

/// The catalog entity a purchase resolved to.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ShopItem {
    Character(Character),
    Food(Food),
}

impl ShopItem {
    pub fn id(&self) -> Uuid {
        match self {
            ShopItem::Character(c) => c.id,
            ShopItem::Food(f) => f.id,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ShopItem::Character(_) => ItemKind::Character,
            ShopItem::Food(_) => ItemKind::Food,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ShopItem::Character(c) => &c.name,
            ShopItem::Food(f) => &f.name,
        }
    }

    pub fn price(&self) -> Decimal {
        match self {
            ShopItem::Character(c) => c.price,
            ShopItem::Food(f) => f.price,
        }
    }
}

/// What a completed purchase hands back to the caller.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub new_balance: Decimal,
    pub item: ShopItem,
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

#[async_trait]
pub trait ShopStore: Send + Sync {
    /// All characters, price ascending then name.
    async fn characters(&self) -> Result<Vec<Character>, GameError>;

    /// Characters eligible as a first pet.
    async fn starter_characters(&self) -> Result<Vec<Character>, GameError>;

    /// All foods, price ascending then name.
    async fn foods(&self) -> Result<Vec<Food>, GameError>;

    async fn character(&self, id: Uuid) -> Result<Option<Character>, GameError>;

    async fn food(&self, id: Uuid) -> Result<Option<Food>, GameError>;

    async fn inventory(&self, user_id: Uuid) -> Result<Vec<InventoryEntry>, GameError>;

    async fn owns(&self, user_id: Uuid, kind: ItemKind, item_id: Uuid)
        -> Result<bool, GameError>;

    /// One transaction: debit the wallet by the item price (ledger row
    /// included) and upsert the inventory row. Foods stack; an already-owned
    /// character leaves the inventory untouched. Returns the post-debit
    /// balance.
    async fn purchase(
        &self,
        user_id: Uuid,
        item: &ShopItem,
        description: &str,
    ) -> Result<Decimal, GameError>;

    /// Decrement a stack by `quantity`, deleting the row at zero.
    async fn consume(
        &self,
        user_id: Uuid,
        kind: ItemKind,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<(), GameError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ShopService<S: ShopStore> {
    store: S,
}

impl<S: ShopStore> ShopService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn list_characters(&self) -> Result<Vec<Character>, GameError> {
        self.store.characters().await
    }

    pub async fn list_starter_characters(&self) -> Result<Vec<Character>, GameError> {
        self.store.starter_characters().await
    }

    pub async fn list_foods(&self) -> Result<Vec<Food>, GameError> {
        self.store.foods().await
    }

    pub async fn get_character(&self, id: Uuid) -> Result<Character, GameError> {
        self.store
            .character(id)
            .await?
            .ok_or(GameError::NotFound("character"))
    }

    pub async fn get_food(&self, id: Uuid) -> Result<Food, GameError> {
        self.store.food(id).await?.ok_or(GameError::NotFound("food"))
    }

    pub async fn inventory(&self, user_id: Uuid) -> Result<Vec<InventoryEntry>, GameError> {
        self.store.inventory(user_id).await
    }

    #[allow(dead_code)]
    pub async fn user_owns(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        kind: ItemKind,
    ) -> Result<bool, GameError> {
        self.store.owns(user_id, kind, item_id).await
    }

    /// Buy one unit of a catalog item.
    pub async fn purchase(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        kind: ItemKind,
    ) -> Result<PurchaseReceipt, GameError> {
        let item = match kind {
            ItemKind::Character => ShopItem::Character(self.get_character(item_id).await?),
            ItemKind::Food => ShopItem::Food(self.get_food(item_id).await?),
        };
        let description = format!("Purchased {}", item.name());

        let new_balance = match self.store.purchase(user_id, &item, &description).await {
            // Lazy wallet / inventory inserts can race; one retry settles it.
            Err(GameError::Conflict(_)) => {
                self.store.purchase(user_id, &item, &description).await?
            }
            other => other?,
        };

        tracing::info!(
            user_id = %user_id,
            item = item.name(),
            price = %item.price(),
            "shop purchase completed"
        );
        Ok(PurchaseReceipt { new_balance, item })
    }

    /// Remove `quantity` units of an owned stack.
    #[allow(dead_code)]
    pub async fn consume_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        kind: ItemKind,
        quantity: i32,
    ) -> Result<(), GameError> {
        if quantity <= 0 {
            return Err(GameError::InvalidAmount(format!(
                "quantity must be positive, got {}",
                quantity
            )));
        }
        self.store.consume(user_id, kind, item_id, quantity).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
