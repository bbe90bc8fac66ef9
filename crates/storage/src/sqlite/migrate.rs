use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (events, question bank with choices, roleplay
/// prompts with indicators, accounts, session summaries, and indexes).
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS events (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    category TEXT,
                    created_at TEXT NOT NULL,
                    practice_size INTEGER NOT NULL CHECK (practice_size > 0),
                    shuffle_practice INTEGER NOT NULL CHECK (shuffle_practice IN (0, 1)),
                    points_per_correct INTEGER NOT NULL CHECK (points_per_correct >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id INTEGER NOT NULL,
                    event_id INTEGER NOT NULL,
                    prompt TEXT NOT NULL,
                    correct_choice INTEGER NOT NULL CHECK (correct_choice >= 0),
                    explanation TEXT,
                    PRIMARY KEY (id, event_id),
                    FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS question_choices (
                    question_id INTEGER NOT NULL,
                    event_id INTEGER NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    body TEXT NOT NULL,
                    PRIMARY KEY (question_id, event_id, position),
                    FOREIGN KEY (question_id, event_id)
                        REFERENCES questions(id, event_id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS roleplay_prompts (
                    id INTEGER PRIMARY KEY,
                    event_id INTEGER NOT NULL,
                    title TEXT NOT NULL,
                    scenario TEXT NOT NULL,
                    FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS roleplay_indicators (
                    prompt_id INTEGER NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    body TEXT NOT NULL,
                    PRIMARY KEY (prompt_id, position),
                    FOREIGN KEY (prompt_id)
                        REFERENCES roleplay_prompts(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS accounts (
                    id INTEGER PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    points INTEGER NOT NULL CHECK (points >= 0),
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS session_summaries (
                    id INTEGER PRIMARY KEY,
                    session_uuid TEXT NOT NULL UNIQUE,
                    event_id INTEGER NOT NULL,
                    mode TEXT NOT NULL,
                    started_at TEXT NOT NULL,
                    completed_at TEXT NOT NULL,
                    total_items INTEGER NOT NULL CHECK (total_items >= 0),
                    answered INTEGER NOT NULL CHECK (answered >= 0),
                    correct INTEGER NOT NULL CHECK (correct >= 0),
                    percentage INTEGER NOT NULL CHECK (percentage BETWEEN 0 AND 100),
                    FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_event
                    ON questions (event_id, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_roleplay_prompts_event
                    ON roleplay_prompts (event_id, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_accounts_points
                    ON accounts (points DESC, username);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_session_summaries_event_completed
                    ON session_summaries (event_id, completed_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
