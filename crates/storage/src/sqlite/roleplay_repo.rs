use std::collections::HashMap;

use prep_core::model::{EventId, ItemId, RoleplayPrompt};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{event_id_from_i64, id_i64, item_id_from_i64, ser};
use crate::repository::{RoleplayRepository, StorageError};

fn map_prompt(
    row: &sqlx::sqlite::SqliteRow,
    indicators: Vec<String>,
) -> Result<RoleplayPrompt, StorageError> {
    RoleplayPrompt::new(
        item_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        event_id_from_i64(row.try_get::<i64, _>("event_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("scenario").map_err(ser)?,
        indicators,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl RoleplayRepository for SqliteRepository {
    async fn upsert_prompt(&self, prompt: &RoleplayPrompt) -> Result<(), StorageError> {
        let prompt_id = id_i64("item_id", prompt.id().value())?;
        let event = id_i64("event_id", prompt.event_id().value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO roleplay_prompts (id, event_id, title, scenario)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                event_id = excluded.event_id,
                title = excluded.title,
                scenario = excluded.scenario
            ",
        )
        .bind(prompt_id)
        .bind(event)
        .bind(prompt.title().to_owned())
        .bind(prompt.scenario().to_owned())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query("DELETE FROM roleplay_indicators WHERE prompt_id = ?1")
            .bind(prompt_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for (position, body) in prompt.indicators().iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("indicator position overflow".into()))?;
            sqlx::query(
                r"
                INSERT INTO roleplay_indicators (prompt_id, position, body)
                VALUES (?1, ?2, ?3)
                ",
            )
            .bind(prompt_id)
            .bind(position)
            .bind(body.clone())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_prompt(&self, id: ItemId) -> Result<Option<RoleplayPrompt>, StorageError> {
        let prompt_id = id_i64("item_id", id.value())?;

        let row = sqlx::query(
            "SELECT id, event_id, title, scenario FROM roleplay_prompts WHERE id = ?1",
        )
        .bind(prompt_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let indicator_rows = sqlx::query(
            r"
            SELECT body FROM roleplay_indicators
            WHERE prompt_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(prompt_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut indicators = Vec::with_capacity(indicator_rows.len());
        for indicator_row in indicator_rows {
            indicators.push(indicator_row.try_get::<String, _>("body").map_err(ser)?);
        }

        map_prompt(&row, indicators).map(Some)
    }

    async fn list_prompts(
        &self,
        event_id: EventId,
        limit: u32,
    ) -> Result<Vec<RoleplayPrompt>, StorageError> {
        let event = id_i64("event_id", event_id.value())?;

        let prompt_rows = sqlx::query(
            r"
            SELECT id, event_id, title, scenario
            FROM roleplay_prompts
            WHERE event_id = ?1
            ORDER BY id ASC
            LIMIT ?2
            ",
        )
        .bind(event)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let indicator_rows = sqlx::query(
            r"
            SELECT ri.prompt_id, ri.body
            FROM roleplay_indicators ri
            JOIN roleplay_prompts rp ON rp.id = ri.prompt_id
            WHERE rp.event_id = ?1
            ORDER BY ri.prompt_id ASC, ri.position ASC
            ",
        )
        .bind(event)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut indicators_by_prompt: HashMap<i64, Vec<String>> = HashMap::new();
        for row in indicator_rows {
            let prompt_id: i64 = row.try_get("prompt_id").map_err(ser)?;
            let body: String = row.try_get("body").map_err(ser)?;
            indicators_by_prompt
                .entry(prompt_id)
                .or_default()
                .push(body);
        }

        let mut prompts = Vec::with_capacity(prompt_rows.len());
        for row in prompt_rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            let indicators = indicators_by_prompt.remove(&id).unwrap_or_default();
            prompts.push(map_prompt(&row, indicators)?);
        }

        Ok(prompts)
    }

    async fn delete_prompt(&self, id: ItemId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM roleplay_prompts WHERE id = ?1")
            .bind(id_i64("item_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
