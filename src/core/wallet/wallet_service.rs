// Wallet engine - coin balances and the append-only ledger.
//
// This module contains the domain logic for the virtual-coin economy.
// It is platform-agnostic: storage is reached through the WalletStore trait,
// implemented by PostgreSQL in `infra` and by in-memory fakes in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::GameError;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// A user's coin wallet. Created lazily on first read or first credit.
#[derive(Debug, Clone)]
pub struct Wallet {
    pub id: Uuid,
    #[allow(dead_code)]
    pub user_id: Uuid,
    pub balance: Decimal,
    #[allow(dead_code)]
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the wallet ledger. `amount` is signed: positive for credits,
/// negative for debits. Summing a wallet's rows yields its current balance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Why a balance moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    MissionReward,
    GoalBonus,
    ShopPurchase,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::MissionReward => "mission_reward",
            TransactionType::GoalBonus => "goal_bonus",
            TransactionType::ShopPurchase => "shop_purchase",
            TransactionType::Adjustment => "adjustment",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "mission_reward" => Some(TransactionType::MissionReward),
            "goal_bonus" => Some(TransactionType::GoalBonus),
            "shop_purchase" => Some(TransactionType::ShopPurchase),
            "adjustment" => Some(TransactionType::Adjustment),
            _ => None,
        }
    }
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Persistence contract for wallets.
///
/// `credit` and `debit` are transactional: the balance update and the ledger
/// append succeed together or not at all, and concurrent updates to the same
/// wallet are serialized by the store.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Fetch the user's wallet, creating an empty one if absent.
    async fn get_or_create(&self, user_id: Uuid) -> Result<Wallet, GameError>;

    /// Add `amount` (strictly positive) and append the matching ledger row.
    async fn credit(
        &self,
        user_id: Uuid,
        amount: Decimal,
        transaction_type: TransactionType,
        description: Option<String>,
    ) -> Result<Wallet, GameError>;

    /// Subtract `amount` and append the ledger row. Fails with
    /// `InsufficientFunds` when the balance cannot cover it.
    async fn debit(
        &self,
        user_id: Uuid,
        amount: Decimal,
        transaction_type: TransactionType,
        description: Option<String>,
    ) -> Result<Wallet, GameError>;

    /// Newest-first ledger rows for the user's wallet.
    async fn history(&self, user_id: Uuid, limit: i64) -> Result<Vec<WalletTransaction>, GameError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub const DEFAULT_HISTORY_LIMIT: i64 = 20;
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// The main service for wallet operations.
pub struct WalletService<S: WalletStore> {
    store: S,
}

impl<S: WalletStore> WalletService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current wallet, created lazily with balance 0.
    pub async fn balance(&self, user_id: Uuid) -> Result<Wallet, GameError> {
        self.store.get_or_create(user_id).await
    }

    #[allow(dead_code)]
    pub async fn credit(
        &self,
        user_id: Uuid,
        amount: Decimal,
        transaction_type: TransactionType,
        description: Option<String>,
    ) -> Result<Wallet, GameError> {
        ensure_positive(amount)?;
        match self
            .store
            .credit(user_id, amount, transaction_type, description.clone())
            .await
        {
            // A concurrent first-credit can race the lazy wallet insert.
            Err(GameError::Conflict(_)) => {
                self.store
                    .credit(user_id, amount, transaction_type, description)
                    .await
            }
            other => other,
        }
    }

    #[allow(dead_code)]
    pub async fn debit(
        &self,
        user_id: Uuid,
        amount: Decimal,
        transaction_type: TransactionType,
        description: Option<String>,
    ) -> Result<Wallet, GameError> {
        ensure_positive(amount)?;
        match self
            .store
            .debit(user_id, amount, transaction_type, description.clone())
            .await
        {
            Err(GameError::Conflict(_)) => {
                self.store
                    .debit(user_id, amount, transaction_type, description)
                    .await
            }
            other => other,
        }
    }

    /// Recent ledger rows, newest first. `limit` is clamped to
    /// `1..=MAX_HISTORY_LIMIT`.
    pub async fn history(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<WalletTransaction>, GameError> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        self.store.history(user_id, limit).await
    }
}

fn ensure_positive(amount: Decimal) -> Result<(), GameError> {
    if amount <= Decimal::ZERO {
        return Err(GameError::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
