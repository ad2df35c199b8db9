//! In-memory store doubles for handler tests.

use std::cmp::Ordering;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use super::{
    ensure_object, Document, DocumentQuery, DocumentStore, ObjectStore, OrderField, SortOrder,
    StorageError,
};

#[derive(Default)]
pub struct MemoryDocumentStore {
    rows: Mutex<Vec<(String, Document)>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.rows.lock().iter().filter(|(c, _)| c == collection).count()
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, record: Value) -> Result<Uuid, StorageError> {
        ensure_object(&record)?;
        let mut rows = self.rows.lock();
        // Strictly increasing timestamps keep newest-first ordering deterministic.
        let now = Utc::now();
        let created_at = rows
            .last()
            .map(|(_, d)| d.created_at + Duration::microseconds(1))
            .map_or(now, |next: DateTime<Utc>| next.max(now));
        let id = Uuid::new_v4();
        rows.push((
            collection.to_string(),
            Document {
                id,
                data: record,
                created_at,
            },
        ));
        Ok(id)
    }

    async fn query(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>, StorageError> {
        let rows = self.rows.lock();
        let mut found: Vec<Document> = rows
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, d)| d)
            .filter(|d| {
                query
                    .filter
                    .iter()
                    .all(|(key, value)| d.data.get(key) == Some(value))
            })
            .cloned()
            .collect();

        found.sort_by(|a, b| {
            let ord = match &query.order_by {
                OrderField::CreatedAt => a.created_at.cmp(&b.created_at),
                OrderField::Data(field) => compare(a.data.get(field), b.data.get(field)),
            };
            match query.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        if let Some(limit) = query.limit {
            found.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(found)
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StorageError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .find(|(c, d)| c == collection && d.id == id)
            .map(|(_, d)| d.clone()))
    }

    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        patch: Value,
    ) -> Result<bool, StorageError> {
        ensure_object(&patch)?;
        let mut rows = self.rows.lock();
        let Some((_, doc)) = rows.iter_mut().find(|(c, d)| c == collection && d.id == id) else {
            return Ok(false);
        };
        if let (Some(data), Value::Object(patch)) = (doc.data.as_object_mut(), patch) {
            data.extend(patch);
        }
        Ok(true)
    }
}

/// Records uploads; optionally fails every put.
#[derive(Default)]
pub struct MemoryObjectStore {
    pub objects: Mutex<Vec<(String, usize, String)>>,
    pub fail: bool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        if self.fail {
            return Err(StorageError::ObjectStore("bucket unavailable".to_string()));
        }
        self.objects
            .lock()
            .push((path.to_string(), bytes.len(), content_type.to_string()));
        Ok(format!("memory://{path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_query_filters_orders_and_limits() {
        let store = MemoryDocumentStore::new();
        for (user, score) in [("a", 10), ("b", 99), ("a", 50), ("a", 30)] {
            store
                .create("analyses", json!({"user_id": user, "match_score": score}))
                .await
                .unwrap();
        }

        let newest = store
            .query("analyses", &DocumentQuery::new().filter_eq("user_id", "a").limit(2))
            .await
            .unwrap();
        let scores: Vec<_> = newest.iter().map(|d| d.data["match_score"].clone()).collect();
        assert_eq!(scores, vec![json!(30), json!(50)]);

        let by_score = store
            .query(
                "analyses",
                &DocumentQuery::new()
                    .filter_eq("user_id", "a")
                    .order_by(OrderField::Data("match_score".into()), SortOrder::Desc),
            )
            .await
            .unwrap();
        let scores: Vec<_> = by_score.iter().map(|d| d.data["match_score"].clone()).collect();
        assert_eq!(scores, vec![json!(50), json!(30), json!(10)]);
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let store = MemoryDocumentStore::new();
        let id = store
            .create("resumes", json!({"status": "active", "file_name": "cv.pdf"}))
            .await
            .unwrap();

        assert!(store.update("resumes", id, json!({"status": "deleted"})).await.unwrap());
        let doc = store.get("resumes", id).await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"status": "deleted", "file_name": "cv.pdf"}));

        assert!(!store.update("resumes", Uuid::new_v4(), json!({})).await.unwrap());
        assert!(store.get("analyses", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_object_record_rejected() {
        let store = MemoryDocumentStore::new();
        assert!(matches!(
            store.create("resumes", json!([1, 2])).await,
            Err(StorageError::Serialization(_))
        ));
    }
}
