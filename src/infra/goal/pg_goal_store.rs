// PostgreSQL implementation of the GoalStore trait.
//
// `add_progress` locks the goal row, so two concurrent calls that together
// cross the target serialize and the bonus credits exactly once.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::core::error::GameError;
use crate::core::goal::{
    completion_bonus, progress_pct, Goal, GoalFilter, GoalProgressOutcome, GoalStore,
};
use crate::core::wallet::TransactionType;
use crate::infra::db::db_err;
use crate::infra::wallet::apply_signed;

pub struct PgGoalStore {
    pool: PgPool,
}

impl PgGoalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn goal_from_row(row: &PgRow) -> Goal {
    Goal {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        target_amount: row.get("target_amount"),
        current_amount: row.get("current_amount"),
        completed: row.get("completed"),
        completed_at: row.get("completed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLUMNS: &str = "id, user_id, title, description, target_amount, current_amount, \
                              completed, completed_at, created_at, updated_at";

#[async_trait]
impl GoalStore for PgGoalStore {
    async fn insert(&self, goal: Goal) -> Result<Goal, GameError> {
        sqlx::query(
            "INSERT INTO goals (id, user_id, title, description, target_amount, current_amount, \
             completed, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(goal.id)
        .bind(goal.user_id)
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(goal.target_amount)
        .bind(goal.current_amount)
        .bind(goal.completed)
        .bind(goal.created_at)
        .bind(goal.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(goal)
    }

    async fn list(&self, user_id: Uuid, filter: GoalFilter) -> Result<Vec<Goal>, GameError> {
        let condition = match filter {
            GoalFilter::All => "",
            GoalFilter::Active => " AND NOT completed",
            GoalFilter::Completed => " AND completed",
        };
        let rows = sqlx::query(&format!(
            "SELECT {} FROM goals WHERE user_id = $1{} ORDER BY created_at DESC",
            SELECT_COLUMNS, condition
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.iter().map(goal_from_row).collect())
    }

    async fn add_progress(
        &self,
        id: Uuid,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<GoalProgressOutcome, GameError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM goals WHERE id = $1 AND user_id = $2 FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        let Some(row) = row else {
            return Err(GameError::NotFound("goal"));
        };
        let goal = goal_from_row(&row);
        if goal.completed {
            return Err(GameError::AlreadyCompleted);
        }

        let new_amount = goal.current_amount + amount;
        let completes = new_amount >= goal.target_amount;
        let update_sql = if completes {
            format!(
                "UPDATE goals SET current_amount = $2, completed = TRUE, completed_at = now(), \
                 updated_at = now() WHERE id = $1 RETURNING {}",
                SELECT_COLUMNS
            )
        } else {
            format!(
                "UPDATE goals SET current_amount = $2, updated_at = now() \
                 WHERE id = $1 RETURNING {}",
                SELECT_COLUMNS
            )
        };
        let row = sqlx::query(&update_sql)
            .bind(goal.id)
            .bind(new_amount)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
        let updated = goal_from_row(&row);

        let mut bonus_awarded = None;
        if completes {
            let bonus = completion_bonus(updated.target_amount);
            if bonus > Decimal::ZERO {
                apply_signed(
                    &mut *tx,
                    user_id,
                    bonus,
                    TransactionType::GoalBonus,
                    Some(&format!("Completed goal: {}", updated.title)),
                )
                .await?;
                bonus_awarded = Some(bonus);
            }
        }

        tx.commit().await.map_err(db_err)?;
        Ok(GoalProgressOutcome {
            progress_pct: progress_pct(updated.current_amount, updated.target_amount),
            goal: updated,
            bonus_awarded,
        })
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), GameError> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(GameError::NotFound("goal"));
        }
        Ok(())
    }
}
