use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ensure_object, Document, DocumentQuery, DocumentStore, OrderField, StorageError};

/// Every collection lives in one `documents` table; records are JSONB.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url` and makes sure the schema exists.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!("PostgreSQL connection pool established");

        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Creates the `documents` table and its indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id          UUID PRIMARY KEY,
                collection  TEXT NOT NULL,
                data        JSONB NOT NULL,
                created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_collection_created_idx \
             ON documents (collection, created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_data_idx \
             ON documents USING GIN (data jsonb_path_ops)",
        )
        .execute(&self.pool)
        .await?;

        info!("documents schema ready");
        Ok(())
    }
}

/// Builds the SELECT for `query`. `$1` collection, `$2` filter, `$3` limit, `$4` order field.
fn select_sql(query: &DocumentQuery) -> String {
    let dir = query.order.as_sql();
    let order = match &query.order_by {
        OrderField::CreatedAt => format!("created_at {dir}"),
        OrderField::Data(_) => format!("data -> $4 {dir}, created_at DESC"),
    };
    format!(
        "SELECT id, data, created_at FROM documents \
         WHERE collection = $1 AND data @> $2 \
         ORDER BY {order} \
         LIMIT $3"
    )
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, collection: &str, record: Value) -> Result<Uuid, StorageError> {
        ensure_object(&record)?;
        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO documents (id, collection, data) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(collection)
            .bind(&record)
            .execute(&self.pool)
            .await?;

        debug!("Created {collection}/{id}");
        Ok(id)
    }

    async fn query(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>, StorageError> {
        let sql = select_sql(query);
        let mut q = sqlx::query_as::<_, Document>(&sql)
            .bind(collection)
            .bind(Value::Object(query.filter.clone()))
            .bind(query.limit);
        if let OrderField::Data(field) = &query.order_by {
            q = q.bind(field.clone());
        }

        Ok(q.fetch_all(&self.pool).await?)
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StorageError> {
        Ok(sqlx::query_as::<_, Document>(
            "SELECT id, data, created_at FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        patch: Value,
    ) -> Result<bool, StorageError> {
        ensure_object(&patch)?;

        let result = sqlx::query(
            "UPDATE documents SET data = data || $3 WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .bind(&patch)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
