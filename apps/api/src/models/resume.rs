use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::analysis::AnalysisResult;

pub const RESUMES_COLLECTION: &str = "resumes";
pub const ANALYSES_COLLECTION: &str = "analyses";

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_DELETED: &str = "deleted";

/// An uploaded résumé file as stored in the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub user_id: String,
    pub file_url: String,
    pub file_name: String,
    pub status: String,
}

/// One analysis run, flattened so the result fields sit at the top level of the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub user_id: String,
    pub resume_id: Uuid,
    pub job_description: String,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

/// A stored record plus its store-assigned id and creation time, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}
