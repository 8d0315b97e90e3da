// PostgreSQL implementation of the WalletStore trait.
//
// The in-transaction helpers (`lock_wallet`, `apply_signed`) are shared with
// the shop, mission, goal and profile stores so every derived credit or
// debit lands in the caller's transaction.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::core::error::GameError;
use crate::core::wallet::{TransactionType, Wallet, WalletStore, WalletTransaction};
use crate::infra::db::db_err;

pub struct PgWalletStore {
    pool: PgPool,
}

impl PgWalletStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn wallet_from_row(row: &PgRow) -> Wallet {
    Wallet {
        id: row.get("id"),
        user_id: row.get("user_id"),
        balance: row.get("balance"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn transaction_from_row(row: &PgRow) -> Result<WalletTransaction, GameError> {
    let tag: String = row.get("transaction_type");
    let transaction_type = TransactionType::parse(&tag)
        .ok_or_else(|| GameError::Internal(format!("unknown transaction type: {}", tag)))?;
    Ok(WalletTransaction {
        id: row.get("id"),
        wallet_id: row.get("wallet_id"),
        amount: row.get("amount"),
        transaction_type,
        description: row.get("description"),
        created_at: row.get("created_at"),
    })
}

/// Locks the user's wallet row inside `conn`, creating it first if needed.
pub(crate) async fn lock_wallet(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Wallet, GameError> {
    sqlx::query("INSERT INTO wallets (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;

    let row = sqlx::query(
        "SELECT id, user_id, balance, created_at, updated_at FROM wallets \
         WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(wallet_from_row(&row))
}

/// Applies a signed amount to the wallet and appends the ledger row. The
/// caller owns the surrounding transaction; a negative amount that would
/// take the balance below zero fails with `InsufficientFunds`.
pub(crate) async fn apply_signed(
    conn: &mut PgConnection,
    user_id: Uuid,
    signed_amount: Decimal,
    transaction_type: TransactionType,
    description: Option<&str>,
) -> Result<Wallet, GameError> {
    let wallet = lock_wallet(conn, user_id).await?;
    if signed_amount < Decimal::ZERO && wallet.balance + signed_amount < Decimal::ZERO {
        return Err(GameError::InsufficientFunds {
            required: -signed_amount,
            available: wallet.balance,
        });
    }

    let row = sqlx::query(
        "UPDATE wallets SET balance = balance + $2, updated_at = now() \
         WHERE id = $1 RETURNING id, user_id, balance, created_at, updated_at",
    )
    .bind(wallet.id)
    .bind(signed_amount)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_err)?;

    sqlx::query(
        "INSERT INTO wallet_transactions (id, wallet_id, amount, transaction_type, description) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(wallet.id)
    .bind(signed_amount)
    .bind(transaction_type.as_str())
    .bind(description)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    Ok(wallet_from_row(&row))
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn get_or_create(&self, user_id: Uuid) -> Result<Wallet, GameError> {
        let existing = sqlx::query(
            "SELECT id, user_id, balance, created_at, updated_at FROM wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        if let Some(row) = existing {
            return Ok(wallet_from_row(&row));
        }

        sqlx::query(
            "INSERT INTO wallets (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let row = sqlx::query(
            "SELECT id, user_id, balance, created_at, updated_at FROM wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(wallet_from_row(&row))
    }

    async fn credit(
        &self,
        user_id: Uuid,
        amount: Decimal,
        transaction_type: TransactionType,
        description: Option<String>,
    ) -> Result<Wallet, GameError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let wallet =
            apply_signed(&mut *tx, user_id, amount, transaction_type, description.as_deref())
                .await?;
        tx.commit().await.map_err(db_err)?;
        Ok(wallet)
    }

    async fn debit(
        &self,
        user_id: Uuid,
        amount: Decimal,
        transaction_type: TransactionType,
        description: Option<String>,
    ) -> Result<Wallet, GameError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let wallet =
            apply_signed(&mut *tx, user_id, -amount, transaction_type, description.as_deref())
                .await?;
        tx.commit().await.map_err(db_err)?;
        Ok(wallet)
    }

    async fn history(&self, user_id: Uuid, limit: i64) -> Result<Vec<WalletTransaction>, GameError> {
        let rows = sqlx::query(
            "SELECT t.id, t.wallet_id, t.amount, t.transaction_type, t.description, t.created_at \
             FROM wallet_transactions t \
             JOIN wallets w ON w.id = t.wallet_id \
             WHERE w.user_id = $1 \
             ORDER BY t.created_at DESC \
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(transaction_from_row).collect()
    }
}
