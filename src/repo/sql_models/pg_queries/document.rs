use futures::{TryStreamExt, future};
use sqlx::{Postgres, Row, postgres::PgArguments, postgres::PgRow, query::Query};

use crate::{
    query,
    repo::{self, Document},
    types,
};

/// Name of the JSONB column holding the document
const BODY_COLUMN: &str = "body";

pub async fn document_insert<'e, E>(
    exec: E,
    collection: &types::CollectionName,
    document_uuid: uuid::Uuid,
    body: &Document,
) -> Result<(), repo::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"INSERT INTO document_t (document_uuid, collection, body)
        VALUES ($1, $2, $3)"#,
    )
    .bind(document_uuid)
    .bind(collection.as_str())
    .bind(serde_json::Value::Object(body.clone()))
    .execute(exec)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => repo::Error::DuplicateKey {
            collection: collection.to_string(),
            key: db.constraint().unwrap_or_else(|| db.message()).to_owned(),
        },
        e => e.into(),
    })?;
    Ok(())
}

/// Returns the documents of `collection` matching `filter`, in insertion order.
pub async fn documents_find<'e, E>(
    exec: E,
    collection: &types::CollectionName,
    filter: &query::Filter,
    limit: Option<usize>,
) -> Result<Vec<Document>, repo::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    // $1 is reserved for the collection name
    let mut mapper = query::JsonbClauseCompiler::new(BODY_COLUMN, 2);
    let compiled = query::ClausesCompiler::new()
        .filter(filter, &mut mapper)
        .compile()?;

    let mut stmt = format!(
        "SELECT body FROM document_t WHERE collection = $1 AND {} ORDER BY row_id",
        compiled.conjunction()
    );
    if let Some(limit) = limit {
        stmt.push_str(&format!(" LIMIT {limit}"));
    }

    let q = bind_values(sqlx::query(&stmt).bind(collection.as_str()), compiled.values);

    let docs: Vec<Document> = q
        .fetch(exec)
        .map_err(repo::Error::from)
        .and_then(|row| future::ready(cast_document(row)))
        .try_collect()
        .await?;

    Ok(docs)
}

pub async fn documents_count<'e, E>(
    exec: E,
    collection: &types::CollectionName,
    filter: &query::Filter,
) -> Result<u64, repo::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let mut mapper = query::JsonbClauseCompiler::new(BODY_COLUMN, 2);
    let compiled = query::ClausesCompiler::new()
        .filter(filter, &mut mapper)
        .compile()?;

    let stmt = format!(
        r#"SELECT COUNT(*) AS "count" FROM document_t WHERE collection = $1 AND {}"#,
        compiled.conjunction()
    );

    let row = bind_values(sqlx::query(&stmt).bind(collection.as_str()), compiled.values)
        .fetch_one(exec)
        .await?;

    let count: i64 = row.try_get("count")?;
    Ok(count.max(0) as u64)
}

pub async fn documents_delete<'e, E>(
    exec: E,
    collection: &types::CollectionName,
    ids: &[uuid::Uuid],
) -> Result<u64, repo::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let res = sqlx::query(
        r#"DELETE FROM document_t
        WHERE collection = $1 AND document_uuid = ANY($2)"#,
    )
    .bind(collection.as_str())
    .bind(ids.to_vec())
    .execute(exec)
    .await?;
    Ok(res.rows_affected())
}

fn bind_values<'q>(
    mut q: Query<'q, Postgres, PgArguments>,
    values: Vec<query::Param>,
) -> Query<'q, Postgres, PgArguments> {
    for v in values {
        q = match v {
            query::Param::Json(v) => q.bind(v),
            query::Param::Scalar(query::Value::Integer(v)) => q.bind(v),
            query::Param::Scalar(query::Value::Float(v)) => q.bind(v),
            query::Param::Scalar(query::Value::Text(v)) => q.bind(v),
            query::Param::Scalar(query::Value::Boolean(v)) => q.bind(v),
        };
    }
    q
}

fn cast_document(row: PgRow) -> Result<Document, repo::Error> {
    let body: sqlx::types::Json<Document> = row.try_get(BODY_COLUMN)?;
    Ok(body.0)
}
