use prep_core::model::{Event, EventId};

use super::SqliteRepository;
use super::mapping::{id_i64, map_event_row};
use crate::repository::{EventRepository, StorageError};

#[async_trait::async_trait]
impl EventRepository for SqliteRepository {
    async fn upsert_event(&self, event: &Event) -> Result<(), StorageError> {
        let id = id_i64("event_id", event.id().value())?;
        let shuffle = i64::from(event.settings().shuffle_practice());

        sqlx::query(
            r"
            INSERT INTO events (
                id, name, category, created_at,
                practice_size, shuffle_practice, points_per_correct
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                practice_size = excluded.practice_size,
                shuffle_practice = excluded.shuffle_practice,
                points_per_correct = excluded.points_per_correct
            ",
        )
        .bind(id)
        .bind(event.name().to_owned())
        .bind(event.category().map(ToOwned::to_owned))
        .bind(event.created_at())
        .bind(i64::from(event.settings().practice_size()))
        .bind(shuffle)
        .bind(i64::from(event.settings().points_per_correct()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, category, created_at,
                   practice_size, shuffle_practice, points_per_correct
            FROM events WHERE id = ?1
            ",
        )
        .bind(id_i64("event_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_event_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_events(&self, limit: u32) -> Result<Vec<Event>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, category, created_at,
                   practice_size, shuffle_practice, points_per_correct
            FROM events
            ORDER BY id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            events.push(map_event_row(&row)?);
        }
        Ok(events)
    }
}
