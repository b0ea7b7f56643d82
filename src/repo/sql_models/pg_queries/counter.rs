use sqlx::Row;

use crate::{
    allocator,
    repo::{self, sql_models},
    types,
};

/// Atomically advances the counter of `seq` and returns the issued value.
///
/// The first call for a registration creates the row with `start_at`, the following
/// ones add `increment` under the row lock taken by the upsert.
pub async fn counter_next<'e, E>(
    exec: E,
    seq: &allocator::AutoIncrement,
) -> Result<i64, repo::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query(
        r#"INSERT INTO counter_t (collection, field, last_value)
        VALUES ($1, $2, $3)
        ON CONFLICT (collection, field)
        DO UPDATE SET
            last_value = counter_t.last_value + $4
        RETURNING last_value"#,
    )
    .bind(seq.collection.as_str())
    .bind(&seq.field)
    .bind(seq.start_at)
    .bind(seq.increment)
    .fetch_one(exec)
    .await?;

    Ok(row.try_get("last_value")?)
}

pub async fn counter_find<'e, E>(
    exec: E,
    collection: &types::CollectionName,
    field: &str,
) -> Result<Option<sql_models::CounterRecord>, repo::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let res = sqlx::query_as::<_, sql_models::CounterRecord>(
        r#"SELECT collection, field, last_value FROM counter_t
        WHERE collection = $1 AND field = $2"#,
    )
    .bind(collection.as_str())
    .bind(field)
    .fetch_optional(exec)
    .await?;
    Ok(res)
}

pub async fn counter_delete<'e, E>(
    exec: E,
    collection: &types::CollectionName,
    field: &str,
) -> Result<(), repo::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(r#"DELETE FROM counter_t WHERE collection = $1 AND field = $2"#)
        .bind(collection.as_str())
        .bind(field)
        .execute(exec)
        .await?;
    Ok(())
}
