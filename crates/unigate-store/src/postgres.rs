//! PostgreSQL document store
//!
//! Each container is a table of JSONB documents keyed by
//! `(partition key value, id)`. Container definitions are recorded in
//! `unigate_containers` so the partition key path survives restarts.
//!
//! Provisioning runs in one transaction holding an advisory lock, so
//! concurrent first calls for the same container see the same result.
//!
//! Queries are rendered from the typed predicates of a [`QuerySpec`] with
//! positional `$n` parameters; values are always bound, never interpolated.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnection, PgExecutor, PgPool, PgPoolOptions};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Postgres, Row};
use std::fmt::Write as _;
use unigate_core::query::is_valid_field_name;
use unigate_core::{Document, PartitionKeyPath, Predicate, QuerySpec, RangeBound, Selection};

use crate::traits::{ensure_id, stamp_system_fields, ContainerProperties, DocumentStore};
use crate::{StoreError, StoreResult};

/// A value bound into a rendered statement
enum Bind {
    Json(Value),
    Text(String),
    Float(f64),
    Int(i64),
}

/// PostgreSQL-backed document store
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and make sure the container catalog exists
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        tracing::info!("Creating PostgreSQL connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await?;

        let store = Self::with_pool(pool);
        store.init_catalog().await?;
        tracing::info!(
            "✓ PostgreSQL document store ready (max_connections: {})",
            max_connections
        );
        Ok(store)
    }

    /// Wrap an existing pool. The catalog table is created lazily by
    /// `create_container_if_not_exists`.
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn init_catalog(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_catalog(&mut tx).await?;
        create_catalog(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    fn table(container: &str) -> StoreResult<String> {
        if is_valid_field_name(container) {
            Ok(format!("\"{}\"", container))
        } else {
            Err(StoreError::ContainerNotFound(container.to_string()))
        }
    }

    async fn partition_key_path(&self, container: &str) -> StoreResult<PartitionKeyPath> {
        read_partition_key_path(&self.pool, container).await
    }

    async fn prepare_write(
        &self,
        container: &str,
        document: &mut Document,
    ) -> StoreResult<(String, String, String)> {
        let path = self.partition_key_path(container).await?;
        let id = ensure_id(document);
        let pk = document
            .partition_key_value(&path)
            .ok_or_else(|| StoreError::MissingPartitionKey {
                container: container.to_string(),
                path: path.to_string(),
            })?;
        let etag = stamp_system_fields(document);
        Ok((id, pk, etag))
    }

    /// Render a query against `table`, returning SQL and binds in order
    fn render(table: &str, query: &QuerySpec) -> StoreResult<(String, Vec<Bind>)> {
        let mut sql = String::new();
        let mut binds = Vec::new();

        match query.selection() {
            Selection::All => {
                let _ = write!(sql, "SELECT doc FROM {} WHERE TRUE", table);
            }
            Selection::Distinct(field) => {
                check_field(field)?;
                let _ = write!(
                    sql,
                    "SELECT DISTINCT ON (doc->'{f}') jsonb_build_object('{f}', doc->'{f}') AS doc, \
                     MIN(seq) OVER (PARTITION BY doc->'{f}') AS first_seq FROM {t} WHERE doc ? '{f}'",
                    f = field,
                    t = table
                );
            }
        }

        for predicate in query.predicates() {
            let field = predicate.field();
            check_field(field)?;
            binds.push(match predicate {
                Predicate::Exact { value, .. } => {
                    let _ = write!(sql, " AND doc->'{}' = ${}", field, binds.len() + 1);
                    Bind::Json(value.clone())
                }
                Predicate::Contains { value, .. } => {
                    let _ = write!(
                        sql,
                        " AND jsonb_typeof(doc->'{f}') = 'string' \
                         AND POSITION(LOWER(${n}) IN LOWER(doc->>'{f}')) > 0",
                        f = field,
                        n = binds.len() + 1
                    );
                    Bind::Text(value.clone())
                }
                Predicate::Range { bound, value, .. } => {
                    let op = match bound {
                        RangeBound::Min => ">=",
                        RangeBound::Max => "<=",
                    };
                    let _ = write!(
                        sql,
                        " AND (CASE WHEN jsonb_typeof(doc->'{f}') = 'number' \
                         THEN (doc->>'{f}')::double precision END) {op} ${n}",
                        f = field,
                        op = op,
                        n = binds.len() + 1
                    );
                    Bind::Float(*value)
                }
            });
        }

        match query.selection() {
            Selection::All => sql.push_str(" ORDER BY seq"),
            Selection::Distinct(_) => {
                sql = format!("SELECT doc FROM ({}) AS d ORDER BY first_seq", sql);
            }
        }

        if let Some(page) = query.pagination() {
            let _ = write!(sql, " OFFSET ${} LIMIT ${}", binds.len() + 1, binds.len() + 2);
            let offset = i64::try_from(page.offset()).map_err(|_| {
                StoreError::InvalidQuery(unigate_core::CoreError::InvalidPagination(format!(
                    "offset {} is out of range",
                    page.offset()
                )))
            })?;
            binds.push(Bind::Int(offset));
            binds.push(Bind::Int(i64::from(page.limit())));
        }

        Ok((sql, binds))
    }

    fn decode(row: &sqlx::postgres::PgRow) -> StoreResult<Document> {
        let Json(value): Json<Value> = row.try_get("doc")?;
        Document::try_from(value).map_err(StoreError::from)
    }
}

fn check_field(field: &str) -> StoreResult<()> {
    if is_valid_field_name(field) {
        Ok(())
    } else {
        Err(StoreError::InvalidQuery(unigate_core::CoreError::InvalidField(
            field.to_string(),
        )))
    }
}

/// Serializes every catalog and table DDL statement until commit
async fn lock_catalog(conn: &mut PgConnection) -> StoreResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext('unigate_containers'))")
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn create_catalog(conn: &mut PgConnection) -> StoreResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS unigate_containers (
            name TEXT PRIMARY KEY,
            partition_key_path TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn read_partition_key_path<'e, E>(executor: E, container: &str) -> StoreResult<PartitionKeyPath>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query("SELECT partition_key_path FROM unigate_containers WHERE name = $1")
        .bind(container)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| StoreError::ContainerNotFound(container.to_string()))?;

    let path: String = row.try_get("partition_key_path")?;
    PartitionKeyPath::parse(&path).map_err(StoreError::from)
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    binds: Vec<Bind>,
) -> Query<'q, Postgres, PgArguments> {
    for bind in binds {
        query = match bind {
            Bind::Json(v) => query.bind(Json(v)),
            Bind::Text(s) => query.bind(s),
            Bind::Float(f) => query.bind(f),
            Bind::Int(i) => query.bind(i),
        };
    }
    query
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl DocumentStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn create_container_if_not_exists(
        &self,
        container: &str,
        partition_key: &PartitionKeyPath,
    ) -> StoreResult<ContainerProperties> {
        let table = Self::table(container)?;
        let mut tx = self.pool.begin().await?;
        lock_catalog(&mut tx).await?;
        create_catalog(&mut tx).await?;

        sqlx::query(
            r#"
            INSERT INTO unigate_containers (name, partition_key_path)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(container)
        .bind(partition_key.as_str())
        .execute(&mut *tx)
        .await?;

        let create = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                seq BIGSERIAL,
                id TEXT NOT NULL,
                pk TEXT NOT NULL,
                etag TEXT NOT NULL,
                doc JSONB NOT NULL,
                PRIMARY KEY (pk, id)
            )
            "#,
            table
        );
        sqlx::query(&create).execute(&mut *tx).await?;

        let partition_key = read_partition_key_path(&mut *tx, container).await?;
        tx.commit().await?;

        Ok(ContainerProperties {
            id: container.to_string(),
            partition_key,
        })
    }

    async fn create_item(&self, container: &str, mut document: Document) -> StoreResult<Document> {
        let table = Self::table(container)?;
        let (id, pk, etag) = self.prepare_write(container, &mut document).await?;

        let sql = format!(
            "INSERT INTO {} (id, pk, etag, doc) VALUES ($1, $2, $3, $4)",
            table
        );
        sqlx::query(&sql)
            .bind(&id)
            .bind(&pk)
            .bind(&etag)
            .bind(Json(document.as_map()))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict {
                        container: container.to_string(),
                        id: id.clone(),
                    }
                } else {
                    StoreError::Database(e)
                }
            })?;

        Ok(document)
    }

    async fn upsert_item(&self, container: &str, mut document: Document) -> StoreResult<Document> {
        let table = Self::table(container)?;
        let (id, pk, etag) = self.prepare_write(container, &mut document).await?;

        let sql = format!(
            r#"
            INSERT INTO {} (id, pk, etag, doc) VALUES ($1, $2, $3, $4)
            ON CONFLICT (pk, id) DO UPDATE SET etag = EXCLUDED.etag, doc = EXCLUDED.doc
            "#,
            table
        );
        sqlx::query(&sql)
            .bind(&id)
            .bind(&pk)
            .bind(&etag)
            .bind(Json(document.as_map()))
            .execute(&self.pool)
            .await?;

        Ok(document)
    }

    async fn read_item(
        &self,
        container: &str,
        id: &str,
        partition_key: &str,
    ) -> StoreResult<Option<Document>> {
        let table = Self::table(container)?;
        let sql = format!("SELECT doc FROM {} WHERE pk = $1 AND id = $2", table);

        let row = sqlx::query(&sql)
            .bind(partition_key)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::decode).transpose()
    }

    async fn replace_item(
        &self,
        container: &str,
        id: &str,
        partition_key: &str,
        mut document: Document,
        if_match: Option<&str>,
    ) -> StoreResult<Document> {
        let table = Self::table(container)?;
        let path = self.partition_key_path(container).await?;

        if document.id() != Some(id) {
            return Err(StoreError::InvalidDocument(format!(
                "replacement for '{}' carries a different id",
                id
            )));
        }
        if document.partition_key_value(&path).as_deref() != Some(partition_key) {
            return Err(StoreError::InvalidDocument(format!(
                "replacement for '{}' changes the partition key value",
                id
            )));
        }

        let etag = stamp_system_fields(&mut document);
        let mut sql = format!(
            "UPDATE {} SET etag = $3, doc = $4 WHERE pk = $1 AND id = $2",
            table
        );
        if if_match.is_some() {
            sql.push_str(" AND etag = $5");
        }

        let mut statement = sqlx::query(&sql)
            .bind(partition_key)
            .bind(id)
            .bind(&etag)
            .bind(Json(document.as_map()));
        if let Some(expected) = if_match {
            statement = statement.bind(expected);
        }
        let result = statement.execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            let exists = self.read_item(container, id, partition_key).await?.is_some();
            return Err(if exists {
                StoreError::PreconditionFailed {
                    container: container.to_string(),
                    id: id.to_string(),
                }
            } else {
                StoreError::NotFound {
                    container: container.to_string(),
                    id: id.to_string(),
                }
            });
        }

        Ok(document)
    }

    async fn delete_item(
        &self,
        container: &str,
        id: &str,
        partition_key: &str,
    ) -> StoreResult<()> {
        let table = Self::table(container)?;
        let sql = format!("DELETE FROM {} WHERE pk = $1 AND id = $2", table);

        let result = sqlx::query(&sql)
            .bind(partition_key)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                container: container.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn query_items(&self, container: &str, query: &QuerySpec) -> StoreResult<Vec<Document>> {
        let table = Self::table(container)?;
        let (sql, binds) = Self::render(&table, query)?;
        tracing::debug!("Generated SQL: {}", sql);

        let rows = bind_all(sqlx::query(&sql), binds)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::decode).collect()
    }

    async fn close(&self) -> StoreResult<()> {
        self.pool.close().await;
        tracing::info!("PostgreSQL pool closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unigate_core::{EntityType, Pagination, QueryBuilder};

    #[test]
    fn test_render_binds_every_value() {
        let query = QueryBuilder::new(EntityType::RentalItem)
            .filter(Predicate::exact("category", "tools'; DROP TABLE x; --"))
            .filter(Predicate::contains("name", "drill"))
            .filter(Predicate::min("price", 5.0))
            .paginate(Some(Pagination::new(2, 10).unwrap()))
            .build()
            .unwrap();

        let (sql, binds) = PostgresStore::render("\"RentalItems\"", &query).unwrap();

        assert!(!sql.contains("DROP TABLE"));
        assert!(sql.contains("doc->'category' = $1"));
        assert!(sql.contains("LOWER($2)"));
        assert!(sql.contains(">= $3"));
        assert!(sql.ends_with("ORDER BY seq OFFSET $4 LIMIT $5"));
        assert_eq!(binds.len(), 5);
    }

    #[test]
    fn test_render_distinct() {
        let query = QueryBuilder::distinct(EntityType::RentalItem, "category")
            .build()
            .unwrap();
        let (sql, binds) = PostgresStore::render("\"RentalItems\"", &query).unwrap();

        assert!(sql.starts_with("SELECT doc FROM (SELECT DISTINCT ON (doc->'category')"));
        assert!(sql.ends_with("ORDER BY first_seq"));
        assert!(binds.is_empty());
    }

    #[test]
    fn test_table_name_must_be_identifier() {
        assert_eq!(PostgresStore::table("Jobs").unwrap(), "\"Jobs\"");
        assert!(PostgresStore::table("Jobs\"; --").is_err());
    }
}
