use prep_core::model::{EventId, SessionSummary};
use sqlx::Row;
use std::collections::HashSet;

use super::SqliteRepository;
use super::mapping::{event_id_from_i64, id_i64, map_summary_row, ser, unique_violation};
use crate::repository::{StorageError, SummaryRepository, SummaryRow};

fn map_summary_row_with_id(row: &sqlx::sqlite::SqliteRow) -> Result<SummaryRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let summary = map_summary_row(row)?;
    Ok(SummaryRow::new(id, summary))
}

#[async_trait::async_trait]
impl SummaryRepository for SqliteRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let event_id = id_i64("event_id", summary.event_id().value())?;

        let res = sqlx::query(
            r"
                INSERT INTO session_summaries (
                    session_uuid, event_id, mode, started_at, completed_at,
                    total_items, answered, correct, percentage
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(summary.session_id().to_string())
        .bind(event_id)
        .bind(summary.mode().as_str())
        .bind(summary.started_at())
        .bind(summary.completed_at())
        .bind(i64::from(summary.total_items()))
        .bind(i64::from(summary.answered()))
        .bind(i64::from(summary.correct()))
        .bind(i64::from(summary.percentage()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if unique_violation(&e) {
                StorageError::Conflict
            } else {
                StorageError::Connection(e.to_string())
            }
        })?;

        Ok(res.last_insert_rowid())
    }

    async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    session_uuid, event_id, mode, started_at, completed_at,
                    total_items, answered, correct, percentage
                FROM session_summaries
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_summary_row(&row)
    }

    async fn list_summaries(
        &self,
        event_id: EventId,
        completed_from: Option<chrono::DateTime<chrono::Utc>>,
        completed_until: Option<chrono::DateTime<chrono::Utc>>,
        limit: u32,
    ) -> Result<Vec<SummaryRow>, StorageError> {
        let mut sql = String::from(
            r"
                SELECT
                    id, session_uuid, event_id, mode, started_at, completed_at,
                    total_items, answered, correct, percentage
                FROM session_summaries
                WHERE event_id = ?1
            ",
        );

        let mut bind_index = 2;
        if completed_from.is_some() {
            sql.push_str(" AND completed_at >= ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        if completed_until.is_some() {
            sql.push_str(" AND completed_at <= ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        sql.push_str(" ORDER BY completed_at DESC, id DESC");
        sql.push_str(" LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql).bind(id_i64("event_id", event_id.value())?);
        if let Some(from) = completed_from {
            query = query.bind(from);
        }
        if let Some(until) = completed_until {
            query = query.bind(until);
        }
        query = query.bind(i64::from(limit));

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_summary_row_with_id(&row)?);
        }

        Ok(out)
    }

    async fn latest_summaries(
        &self,
        event_ids: &[EventId],
    ) -> Result<Vec<SummaryRow>, StorageError> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
                SELECT
                    id, session_uuid, event_id, mode, started_at, completed_at,
                    total_items, answered, correct, percentage
                FROM session_summaries
                WHERE event_id IN (
            ",
        );

        for i in 0..event_ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(")\n ORDER BY event_id ASC, completed_at DESC, id DESC");

        let mut query = sqlx::query(&sql);
        for event_id in event_ids {
            let event = id_i64("event_id", event_id.value())?;
            query = query.bind(event);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in rows {
            let event_id = event_id_from_i64(row.try_get::<i64, _>("event_id").map_err(ser)?)?;
            if !seen.insert(event_id) {
                continue;
            }
            out.push(map_summary_row_with_id(&row)?);
        }

        Ok(out)
    }
}
