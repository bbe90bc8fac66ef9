use std::collections::HashMap;

use prep_core::model::{EventId, Item};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{id_i64, item_id_from_i64, ser, usize_from_i64};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, event_id: EventId, item: &Item) -> Result<(), StorageError> {
        let (choices, correct) = match (item.choices(), item.correct_choice()) {
            (Some(choices), Some(correct)) => (choices, correct),
            _ => {
                return Err(StorageError::Serialization(
                    "open-ended items belong to the roleplay bank".into(),
                ));
            }
        };

        let question_id = id_i64("item_id", item.id().value())?;
        let event = id_i64("event_id", event_id.value())?;
        let correct = i64::try_from(correct)
            .map_err(|_| StorageError::Serialization("correct_choice overflow".into()))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO questions (id, event_id, prompt, correct_choice, explanation)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id, event_id) DO UPDATE SET
                prompt = excluded.prompt,
                correct_choice = excluded.correct_choice,
                explanation = excluded.explanation
            ",
        )
        .bind(question_id)
        .bind(event)
        .bind(item.prompt().to_owned())
        .bind(correct)
        .bind(item.explanation().map(ToOwned::to_owned))
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        // Replace the choice rows wholesale; position is the answer index.
        sqlx::query("DELETE FROM question_choices WHERE question_id = ?1 AND event_id = ?2")
            .bind(question_id)
            .bind(event)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for (position, body) in choices.iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("choice position overflow".into()))?;
            sqlx::query(
                r"
                INSERT INTO question_choices (question_id, event_id, position, body)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(question_id)
            .bind(event)
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

    async fn list_questions(
        &self,
        event_id: EventId,
        limit: u32,
    ) -> Result<Vec<Item>, StorageError> {
        let event = id_i64("event_id", event_id.value())?;

        let question_rows = sqlx::query(
            r"
            SELECT id, prompt, correct_choice, explanation
            FROM questions
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

        let choice_rows = sqlx::query(
            r"
            SELECT question_id, position, body
            FROM question_choices
            WHERE event_id = ?1
            ORDER BY question_id ASC, position ASC
            ",
        )
        .bind(event)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut choices_by_question: HashMap<i64, Vec<String>> = HashMap::new();
        for row in choice_rows {
            let question_id: i64 = row.try_get("question_id").map_err(ser)?;
            let body: String = row.try_get("body").map_err(ser)?;
            choices_by_question
                .entry(question_id)
                .or_default()
                .push(body);
        }

        let mut items = Vec::with_capacity(question_rows.len());
        for row in question_rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            let choices = choices_by_question.remove(&id).unwrap_or_default();
            let correct = usize_from_i64(
                "correct_choice",
                row.try_get::<i64, _>("correct_choice").map_err(ser)?,
            )?;

            let item = Item::multiple_choice(
                item_id_from_i64(id)?,
                row.try_get::<String, _>("prompt").map_err(ser)?,
                choices,
                correct,
                row.try_get::<Option<String>, _>("explanation")
                    .map_err(ser)?,
            )
            .map_err(ser)?;
            items.push(item);
        }

        Ok(items)
    }
}
