//! Persistence collaborators: a JSON document store and an object store.
//!
//! Handlers only see the two traits, so the HTTP layer can run against the
//! in-memory doubles in tests and Postgres / S3 in production.

pub mod postgres;
pub mod s3;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

pub use postgres::PgDocumentStore;
pub use s3::S3ObjectStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("object store error: {0}")]
    ObjectStore(String),

    #[error("invalid record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One stored record.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Reads a top-level string field of the record.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Record fields as a map; empty when the stored data is not an object.
    pub fn fields(&self) -> Map<String, Value> {
        self.data.as_object().cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderField {
    CreatedAt,
    /// A top-level field of the record.
    Data(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Equality filter on top-level fields, one ordering, optional limit.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    pub filter: Map<String, Value>,
    pub order_by: OrderField,
    pub order: SortOrder,
    pub limit: Option<i64>,
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self {
            filter: Map::new(),
            order_by: OrderField::CreatedAt,
            order: SortOrder::Desc,
            limit: None,
        }
    }
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filter.insert(field.to_string(), value.into());
        self
    }

    pub fn order_by(mut self, field: OrderField, order: SortOrder) -> Self {
        self.order_by = field;
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores `record` (a JSON object) and returns its new id.
    async fn create(&self, collection: &str, record: Value) -> Result<Uuid, StorageError>;

    async fn query(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>, StorageError>;

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StorageError>;

    /// Merges `patch` into the top level of the record. Returns false when no such record.
    async fn update(&self, collection: &str, id: Uuid, patch: Value)
        -> Result<bool, StorageError>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads `bytes` under `path` and returns the public URL.
    async fn put(&self, path: &str, bytes: Bytes, content_type: &str)
        -> Result<String, StorageError>;
}

/// Rejects anything but a JSON object, which is the only record shape stored.
fn ensure_object(record: &Value) -> Result<(), StorageError> {
    if record.is_object() {
        Ok(())
    } else {
        Err(StorageError::Serialization(serde::de::Error::custom(
            format!("expected object, got {record}"),
        )))
    }
}
