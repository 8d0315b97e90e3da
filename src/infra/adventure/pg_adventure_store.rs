// PostgreSQL implementation of the AdventureStore trait.
//
// The evaluated-state transition is a single guarded UPDATE on
// `selected_choice_index IS NULL`, so a lost race can never overwrite an
// existing evaluation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

use crate::core::adventure::{Adventure, AdventureStore, ChoiceEvaluation};
use crate::core::error::GameError;
use crate::infra::db::db_err;

pub struct PgAdventureStore {
    pool: PgPool,
}

impl PgAdventureStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn adventure_from_row(row: &PgRow) -> Adventure {
    Adventure {
        id: row.get("id"),
        user_id: row.get("user_id"),
        scenario: row.get("scenario"),
        choices: row.get::<Json<Vec<String>>, _>("choices").0,
        selected_choice_index: row.get("selected_choice_index"),
        feedback: row.get("feedback"),
        scores: row
            .get::<Option<Json<HashMap<String, f64>>>, _>("scores")
            .map(|scores| scores.0),
        generation_trace_id: row.get("generation_trace_id"),
        evaluation_trace_id: row.get("evaluation_trace_id"),
        created_at: row.get("created_at"),
        evaluated_at: row.get("evaluated_at"),
    }
}

const SELECT_COLUMNS: &str = "id, user_id, scenario, choices, selected_choice_index, feedback, \
                              scores, generation_trace_id, evaluation_trace_id, created_at, \
                              evaluated_at";

#[async_trait]
impl AdventureStore for PgAdventureStore {
    async fn insert(&self, adventure: Adventure) -> Result<Adventure, GameError> {
        sqlx::query(
            "INSERT INTO adventures (id, user_id, scenario, choices, generation_trace_id, \
             created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(adventure.id)
        .bind(adventure.user_id)
        .bind(&adventure.scenario)
        .bind(Json(&adventure.choices))
        .bind(&adventure.generation_trace_id)
        .bind(adventure.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(adventure)
    }

    async fn find(&self, id: Uuid, user_id: Uuid) -> Result<Option<Adventure>, GameError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM adventures WHERE id = $1 AND user_id = $2",
            SELECT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.as_ref().map(adventure_from_row))
    }

    async fn history(&self, user_id: Uuid, limit: i64) -> Result<Vec<Adventure>, GameError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM adventures WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.iter().map(adventure_from_row).collect())
    }

    async fn record_evaluation(
        &self,
        id: Uuid,
        user_id: Uuid,
        choice_index: i32,
        evaluation: &ChoiceEvaluation,
        evaluated_at: DateTime<Utc>,
    ) -> Result<Adventure, GameError> {
        let row = sqlx::query(&format!(
            "UPDATE adventures SET selected_choice_index = $3, feedback = $4, scores = $5, \
             evaluation_trace_id = $6, evaluated_at = $7 \
             WHERE id = $1 AND user_id = $2 AND selected_choice_index IS NULL \
             RETURNING {}",
            SELECT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .bind(choice_index)
        .bind(&evaluation.feedback)
        .bind(Json(&evaluation.scores))
        .bind(&evaluation.opik_trace_id)
        .bind(evaluated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => Ok(adventure_from_row(&row)),
            None => {
                // Either the adventure does not exist for this user or the
                // guard lost to an earlier submission.
                let exists =
                    sqlx::query("SELECT 1 FROM adventures WHERE id = $1 AND user_id = $2")
                        .bind(id)
                        .bind(user_id)
                        .fetch_optional(&self.pool)
                        .await
                        .map_err(db_err)?;
                if exists.is_some() {
                    Err(GameError::AlreadySubmitted)
                } else {
                    Err(GameError::NotFound("adventure"))
                }
            }
        }
    }
}
