use crate::{query, repo, types};

const SCHEMA: [&str; 3] = [
    r#"CREATE TABLE IF NOT EXISTS document_t (
        row_id BIGSERIAL PRIMARY KEY,
        document_uuid UUID NOT NULL UNIQUE,
        collection TEXT NOT NULL,
        body JSONB NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS document_collection_idx ON document_t (collection)"#,
    r#"CREATE TABLE IF NOT EXISTS counter_t (
        collection TEXT NOT NULL,
        field TEXT NOT NULL,
        last_value BIGINT NOT NULL,
        PRIMARY KEY (collection, field)
    )"#,
];

/// Creates the tables used by the store, if missing.
pub async fn schema_create<'e, E>(exec: E) -> Result<(), repo::Error>
where
    E: sqlx::PgExecutor<'e> + Copy,
{
    for stmt in SCHEMA {
        sqlx::query(stmt).execute(exec).await?;
    }
    Ok(())
}

/// Creates a partial unique index over a document field of a collection.
///
/// Identifiers cannot be bound as parameters in DDL statements: both the collection name
/// and the field are validated identifiers and are embedded in the statement.
pub async fn unique_index_create<'e, E>(
    exec: E,
    collection: &types::CollectionName,
    field: &str,
) -> Result<(), repo::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    query::validate_field(field)?;

    let stmt = format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_{c}_{f} ON document_t ((NULLIF(body->'{field}', 'null'::jsonb))) WHERE collection = '{c}'",
        c = collection.as_str(),
        f = field.to_ascii_lowercase(),
    );

    // Existing documents sharing a value make the index build fail
    sqlx::query(&stmt)
        .execute(exec)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => repo::Error::DuplicateKey {
                collection: collection.to_string(),
                key: field.to_owned(),
            },
            e => e.into(),
        })?;
    Ok(())
}
