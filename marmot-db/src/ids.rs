//! Snowflake conversion helpers.
//!
//! SQLite has no unsigned 64-bit integer, so Discord snowflakes are
//! stored as `i64` and reinterpreted on the way out. Nullable guild
//! columns that participate in UNIQUE constraints store 0 instead of
//! NULL (NULL rows never conflict in SQLite).

pub(crate) fn id_to_db(id: u64) -> i64 {
    id as i64
}

pub(crate) fn id_from_db(value: i64) -> u64 {
    value as u64
}

pub(crate) fn opt_id_to_db(id: Option<u64>) -> Option<i64> {
    id.map(id_to_db)
}

pub(crate) fn opt_id_from_db(value: Option<i64>) -> Option<u64> {
    value.map(id_from_db)
}

pub(crate) fn guild_to_db(guild_id: Option<u64>) -> i64 {
    guild_id.map(id_to_db).unwrap_or(0)
}

pub(crate) fn guild_from_db(value: i64) -> Option<u64> {
    if value == 0 { None } else { Some(value as u64) }
}
