// PostgreSQL pool setup, schema migration and error classification.
//
// The schema is applied at startup as a batch of idempotent statements.
// Monetary columns are NUMERIC(10,2); ownership foreign keys cascade from
// users; CHECK constraints back the balance and stat invariants the core
// layer maintains.

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::config::DbConfig;
use crate::core::error::GameError;

pub async fn connect(config: &DbConfig) -> anyhow::Result<PgPool> {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);

    let pool = PgPoolOptions::new()
        .min_connections(config.pool_min)
        .max_connections(config.pool_max)
        .idle_timeout(config.idle_timeout)
        .acquire_timeout(config.connect_timeout)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Folds a storage failure into the shared taxonomy. Unique and CHECK
/// violations become `Conflict` (the services retry those once), pool
/// exhaustion becomes `ServiceUnavailable`, everything else is logged and
/// surfaced as an opaque `Internal`.
pub(crate) fn db_err(err: sqlx::Error) -> GameError {
    match &err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => GameError::Conflict("a conflicting record already exists".to_string()),
            Some("23514") => {
                GameError::Conflict("a storage constraint rejected the update".to_string())
            }
            _ => {
                tracing::error!(error = %err, "database error");
                GameError::Internal("database error".to_string())
            }
        },
        sqlx::Error::PoolTimedOut => {
            GameError::ServiceUnavailable("database connection pool exhausted".to_string())
        }
        _ => {
            tracing::error!(error = %err, "database error");
            GameError::Internal("database error".to_string())
        }
    }
}

/// Run schema migrations to create tables.
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username VARCHAR(50) NOT NULL UNIQUE,
        email VARCHAR(255) NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        age INTEGER NOT NULL CHECK (age BETWEEN 5 AND 18),
        allowance NUMERIC(10,2) NOT NULL CHECK (allowance > 0),
        currency CHAR(3) NOT NULL,
        onboarding_completed BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS characters (
        id UUID PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        image_url TEXT,
        is_starter BOOLEAN NOT NULL DEFAULT FALSE,
        price NUMERIC(10,2) NOT NULL CHECK (price >= 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS foods (
        id UUID PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        nutrition_value INTEGER NOT NULL CHECK (nutrition_value >= 1),
        price NUMERIC(10,2) NOT NULL CHECK (price >= 0),
        image_url TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tamagotchis (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        character_id UUID NOT NULL REFERENCES characters(id),
        name VARCHAR(50) NOT NULL,
        hunger INTEGER NOT NULL CHECK (hunger BETWEEN 0 AND 100),
        happiness INTEGER NOT NULL CHECK (happiness BETWEEN 0 AND 100),
        health INTEGER NOT NULL CHECK (health BETWEEN 0 AND 100),
        last_fed_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS wallets (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        balance NUMERIC(10,2) NOT NULL DEFAULT 0 CHECK (balance >= 0),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS wallet_transactions (
        id UUID PRIMARY KEY,
        wallet_id UUID NOT NULL REFERENCES wallets(id) ON DELETE CASCADE,
        amount NUMERIC(10,2) NOT NULL,
        transaction_type VARCHAR(32) NOT NULL,
        description TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_wallet_transactions_wallet
    ON wallet_transactions(wallet_id, created_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_inventory (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        item_type VARCHAR(16) NOT NULL,
        item_id UUID NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity >= 0),
        acquired_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (user_id, item_type, item_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS missions (
        id UUID PRIMARY KEY,
        title VARCHAR(200) NOT NULL,
        description TEXT NOT NULL,
        mission_type VARCHAR(32) NOT NULL,
        requirements JSONB NOT NULL DEFAULT '{}',
        reward_coins NUMERIC(10,2) NOT NULL CHECK (reward_coins >= 0),
        active_date DATE NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_missions_active_date ON missions(active_date)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_missions (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        mission_id UUID NOT NULL REFERENCES missions(id) ON DELETE CASCADE,
        progress JSONB NOT NULL DEFAULT '{}',
        completed BOOLEAN NOT NULL DEFAULT FALSE,
        completed_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (user_id, mission_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS expenses (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        amount NUMERIC(10,2) NOT NULL CHECK (amount > 0),
        category VARCHAR(100) NOT NULL,
        description TEXT,
        logged_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_expenses_user ON expenses(user_id, logged_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS savings (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        amount NUMERIC(10,2) NOT NULL CHECK (amount > 0),
        source VARCHAR(100),
        logged_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_savings_user ON savings(user_id, logged_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS goals (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title VARCHAR(100) NOT NULL,
        description TEXT,
        target_amount NUMERIC(10,2) NOT NULL CHECK (target_amount > 0),
        current_amount NUMERIC(10,2) NOT NULL DEFAULT 0 CHECK (current_amount >= 0),
        completed BOOLEAN NOT NULL DEFAULT FALSE,
        completed_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS adventures (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        scenario TEXT NOT NULL,
        choices JSONB NOT NULL,
        selected_choice_index INTEGER,
        feedback TEXT,
        scores JSONB,
        generation_trace_id TEXT NOT NULL,
        evaluation_trace_id TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        evaluated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_adventures_user ON adventures(user_id, created_at DESC)
    "#,
];
