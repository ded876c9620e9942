//! Test helpers for the bot database.

use crate::{
    bot_db::BotDb,
    error::{DbError, DbResult},
    sqlite_runtime::create_in_memory_pool,
};

/// Create an in-memory bot database for testing
pub async fn create_test_db() -> DbResult<BotDb> {
    let pool = create_in_memory_pool(1).await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

    Ok(BotDb::from_pool(pool))
}
