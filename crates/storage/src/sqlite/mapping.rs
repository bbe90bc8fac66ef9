use prep_core::model::{
    Account, AccountId, Event, EventId, EventSettings, ItemId, SessionId, SessionMode,
    SessionSummary, Username,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn event_id_from_i64(v: i64) -> Result<EventId, StorageError> {
    Ok(EventId::new(i64_to_u64("event_id", v)?))
}

pub(crate) fn item_id_from_i64(v: i64) -> Result<ItemId, StorageError> {
    Ok(ItemId::new(i64_to_u64("item_id", v)?))
}

pub(crate) fn account_id_from_i64(v: i64) -> Result<AccountId, StorageError> {
    Ok(AccountId::new(i64_to_u64("account_id", v)?))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn usize_from_i64(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

/// Converts a `SessionMode` storage string back into the enum.
/// This must stay consistent with `SessionMode::as_str`.
pub(crate) fn parse_mode(s: &str) -> Result<SessionMode, StorageError> {
    match s {
        "practice" => Ok(SessionMode::Practice),
        "test" => Ok(SessionMode::Test),
        "roleplay" => Ok(SessionMode::Roleplay),
        _ => Err(StorageError::Serialization(format!("invalid mode: {s}"))),
    }
}

pub(crate) fn unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

pub(crate) fn map_event_row(row: &sqlx::sqlite::SqliteRow) -> Result<Event, StorageError> {
    let settings = EventSettings::new(
        u32_from_i64(
            "practice_size",
            row.try_get::<i64, _>("practice_size").map_err(ser)?,
        )?,
        row.try_get::<i64, _>("shuffle_practice").map_err(ser)? != 0,
        u32_from_i64(
            "points_per_correct",
            row.try_get::<i64, _>("points_per_correct").map_err(ser)?,
        )?,
    )
    .map_err(ser)?;

    Event::new(
        event_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<Option<String>, _>("category").map_err(ser)?,
        settings,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_account_row(row: &sqlx::sqlite::SqliteRow) -> Result<Account, StorageError> {
    let username =
        Username::new(row.try_get::<String, _>("username").map_err(ser)?).map_err(ser)?;

    Ok(Account::new(
        account_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        username,
        i64_to_u64("points", row.try_get::<i64, _>("points").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    ))
}

pub(crate) fn map_summary_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SessionSummary, StorageError> {
    let uuid: String = row.try_get("session_uuid").map_err(ser)?;
    let session_id = uuid.parse::<SessionId>().map_err(ser)?;

    let mode_str: String = row.try_get("mode").map_err(ser)?;
    let mode = parse_mode(&mode_str)?;

    let percentage_i64: i64 = row.try_get("percentage").map_err(ser)?;
    let percentage = u8::try_from(percentage_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid percentage: {percentage_i64}"))
    })?;

    SessionSummary::from_persisted(
        session_id,
        event_id_from_i64(row.try_get::<i64, _>("event_id").map_err(ser)?)?,
        mode,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        u32_from_i64(
            "total_items",
            row.try_get::<i64, _>("total_items").map_err(ser)?,
        )?,
        u32_from_i64("answered", row.try_get::<i64, _>("answered").map_err(ser)?)?,
        u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
        percentage,
    )
    .map_err(ser)
}
