// PostgreSQL implementation of the MissionStore trait.
//
// `bump_user_mission` is the shared transactional progress update: it locks
// the (lazily created) user-mission row, applies the counter bump and, on
// the completing bump, flips the state and credits the reward through the
// wallet helper - all inside the caller's transaction. The tamagotchi store
// reuses it for care missions.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::core::error::GameError;
use crate::core::mission::{
    bump_progress, CounterMap, Expense, Mission, MissionKind, MissionStore, ProgressUpdate,
    Saving, UserMission, EXPENSE_COUNT, SAVING_COUNT,
};
use crate::core::wallet::TransactionType;
use crate::infra::db::db_err;
use crate::infra::wallet::apply_signed;

pub struct PgMissionStore {
    pool: PgPool,
}

impl PgMissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn mission_from_row(row: &PgRow) -> Result<Mission, GameError> {
    let tag: String = row.get("mission_type");
    let kind = MissionKind::parse(&tag)
        .ok_or_else(|| GameError::Internal(format!("unknown mission type: {}", tag)))?;
    Ok(Mission {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        kind,
        requirements: row.get::<Json<CounterMap>, _>("requirements").0,
        reward_coins: row.get("reward_coins"),
        active_date: row.get("active_date"),
    })
}

fn user_mission_from_row(row: &PgRow) -> UserMission {
    UserMission {
        id: row.get("id"),
        user_id: row.get("user_id"),
        mission_id: row.get("mission_id"),
        progress: row.get::<Json<CounterMap>, _>("progress").0,
        completed: row.get("completed"),
        completed_at: row.get("completed_at"),
        created_at: row.get("created_at"),
    }
}

fn expense_from_row(row: &PgRow) -> Expense {
    Expense {
        id: row.get("id"),
        user_id: row.get("user_id"),
        amount: row.get("amount"),
        category: row.get("category"),
        description: row.get("description"),
        logged_at: row.get("logged_at"),
    }
}

fn saving_from_row(row: &PgRow) -> Saving {
    Saving {
        id: row.get("id"),
        user_id: row.get("user_id"),
        amount: row.get("amount"),
        source: row.get("source"),
        logged_at: row.get("logged_at"),
    }
}

async fn upsert_user_mission(
    conn: &mut PgConnection,
    user_id: Uuid,
    mission_id: Uuid,
    lock: bool,
) -> Result<PgRow, GameError> {
    sqlx::query(
        "INSERT INTO user_missions (id, user_id, mission_id) VALUES ($1, $2, $3) \
         ON CONFLICT (user_id, mission_id) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(mission_id)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    let select = if lock {
        "SELECT id, user_id, mission_id, progress, completed, completed_at, created_at \
         FROM user_missions WHERE user_id = $1 AND mission_id = $2 FOR UPDATE"
    } else {
        "SELECT id, user_id, mission_id, progress, completed, completed_at, created_at \
         FROM user_missions WHERE user_id = $1 AND mission_id = $2"
    };
    sqlx::query(select)
        .bind(user_id)
        .bind(mission_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_err)
}

/// The transactional progress bump. An already-completed mission is left
/// untouched; the completing bump flips the state and credits the reward in
/// the same transaction.
pub(crate) async fn bump_user_mission(
    conn: &mut PgConnection,
    user_id: Uuid,
    mission: &Mission,
    key: &str,
) -> Result<ProgressUpdate, GameError> {
    let row = upsert_user_mission(conn, user_id, mission.id, true).await?;
    let current = user_mission_from_row(&row);
    if current.completed {
        return Ok(ProgressUpdate {
            user_mission_id: current.id,
            progress: current.progress,
            progress_pct: 100.0,
            completed: true,
            reward_credited: None,
        });
    }

    let (progress, progress_pct, just_completed) =
        bump_progress(mission, &current.progress, key);

    if just_completed {
        sqlx::query(
            "UPDATE user_missions SET progress = $2, completed = TRUE, completed_at = now() \
             WHERE id = $1",
        )
        .bind(current.id)
        .bind(Json(&progress))
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;

        let reward = (mission.reward_coins > Decimal::ZERO).then_some(mission.reward_coins);
        if let Some(reward) = reward {
            apply_signed(
                conn,
                user_id,
                reward,
                TransactionType::MissionReward,
                Some(&format!("Completed mission: {}", mission.title)),
            )
            .await?;
        }
        return Ok(ProgressUpdate {
            user_mission_id: current.id,
            progress,
            progress_pct,
            completed: true,
            reward_credited: reward,
        });
    }

    sqlx::query("UPDATE user_missions SET progress = $2 WHERE id = $1")
        .bind(current.id)
        .bind(Json(&progress))
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(ProgressUpdate {
        user_mission_id: current.id,
        progress,
        progress_pct,
        completed: false,
        reward_credited: None,
    })
}

#[async_trait]
impl MissionStore for PgMissionStore {
    async fn mission_for_date(&self, date: NaiveDate) -> Result<Option<Mission>, GameError> {
        let row = sqlx::query(
            "SELECT id, title, description, mission_type, requirements, reward_coins, active_date \
             FROM missions WHERE active_date = $1 LIMIT 1",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(mission_from_row).transpose()
    }

    async fn get_or_create_user_mission(
        &self,
        user_id: Uuid,
        mission_id: Uuid,
    ) -> Result<UserMission, GameError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let row = upsert_user_mission(&mut *tx, user_id, mission_id, false).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(user_mission_from_row(&row))
    }

    async fn record_expense(
        &self,
        user_id: Uuid,
        amount: Decimal,
        category: &str,
        description: Option<&str>,
        mission: Option<&Mission>,
    ) -> Result<(Expense, Option<ProgressUpdate>), GameError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let expense = Expense {
            id: Uuid::new_v4(),
            user_id,
            amount,
            category: category.to_string(),
            description: description.map(str::to_string),
            logged_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO expenses (id, user_id, amount, category, description, logged_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(expense.id)
        .bind(user_id)
        .bind(amount)
        .bind(&expense.category)
        .bind(&expense.description)
        .bind(expense.logged_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let update = match mission {
            Some(mission) => {
                Some(bump_user_mission(&mut *tx, user_id, mission, EXPENSE_COUNT).await?)
            }
            None => None,
        };

        tx.commit().await.map_err(db_err)?;
        Ok((expense, update))
    }

    async fn record_saving(
        &self,
        user_id: Uuid,
        amount: Decimal,
        source: Option<&str>,
        mission: Option<&Mission>,
    ) -> Result<(Saving, Option<ProgressUpdate>), GameError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let saving = Saving {
            id: Uuid::new_v4(),
            user_id,
            amount,
            source: source.map(str::to_string),
            logged_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO savings (id, user_id, amount, source, logged_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(saving.id)
        .bind(user_id)
        .bind(amount)
        .bind(&saving.source)
        .bind(saving.logged_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let update = match mission {
            Some(mission) => {
                Some(bump_user_mission(&mut *tx, user_id, mission, SAVING_COUNT).await?)
            }
            None => None,
        };

        tx.commit().await.map_err(db_err)?;
        Ok((saving, update))
    }

    async fn expenses(&self, user_id: Uuid, limit: i64) -> Result<Vec<Expense>, GameError> {
        let rows = sqlx::query(
            "SELECT id, user_id, amount, category, description, logged_at \
             FROM expenses WHERE user_id = $1 ORDER BY logged_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.iter().map(expense_from_row).collect())
    }

    async fn savings(&self, user_id: Uuid, limit: i64) -> Result<Vec<Saving>, GameError> {
        let rows = sqlx::query(
            "SELECT id, user_id, amount, source, logged_at \
             FROM savings WHERE user_id = $1 ORDER BY logged_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.iter().map(saving_from_row).collect())
    }
}
