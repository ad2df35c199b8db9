use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::analysis::{AnalysisRequest, AnalysisResult};
use crate::models::resume::{
    AnalysisRecord, ResumeRecord, StoredRecord, ANALYSES_COLLECTION, RESUMES_COLLECTION,
    STATUS_ACTIVE, STATUS_DELETED,
};
use crate::pdf::PdfError;
use crate::storage::{Document, DocumentQuery, OrderField, SortOrder, StorageError};
use crate::state::AppState;

pub const DEFAULT_HISTORY_LIMIT: i64 = 10;
pub const MAX_HISTORY_LIMIT: i64 = 50;

const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub resume_id: Uuid,
    pub analysis_id: Uuid,
    pub result: AnalysisResult,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    #[serde(default)]
    pub sort: HistorySort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySort {
    #[default]
    Newest,
    Oldest,
    HighestScore,
    LowestScore,
}

impl HistorySort {
    fn ordering(self) -> (OrderField, SortOrder) {
        let score = || OrderField::Data("match_score".to_string());
        match self {
            HistorySort::Newest => (OrderField::CreatedAt, SortOrder::Desc),
            HistorySort::Oldest => (OrderField::CreatedAt, SortOrder::Asc),
            HistorySort::HighestScore => (score(), SortOrder::Desc),
            HistorySort::LowestScore => (score(), SortOrder::Asc),
        }
    }
}

#[derive(Serialize)]
pub struct AnalysesResponse {
    pub analyses: Vec<StoredRecord>,
}

#[derive(Serialize)]
pub struct ResumesResponse {
    pub resumes: Vec<StoredRecord>,
}

struct UploadedFile {
    name: String,
    content_type: Option<String>,
    bytes: Bytes,
}

impl UploadedFile {
    fn looks_like_pdf(&self) -> bool {
        self.content_type.as_deref() == Some(PDF_CONTENT_TYPE)
            || self.name.to_ascii_lowercase().ends_with(".pdf")
            || self.bytes.starts_with(b"%PDF")
    }
}

/// Keeps object keys to a safe character set.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        "resume.pdf".to_string()
    } else {
        cleaned
    }
}

fn stored(doc: Document) -> StoredRecord {
    StoredRecord {
        id: doc.id,
        created_at: doc.created_at,
        data: doc.fields(),
    }
}

/// POST /api/v1/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mut file = None;
    let mut job_description = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or("resume.pdf").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                file = Some(UploadedFile {
                    name,
                    content_type,
                    bytes,
                });
            }
            Some("job_description") => job_description = Some(field.text().await?),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("missing 'file' field".into()))?;
    if file.bytes.is_empty() {
        return Err(AppError::Validation("uploaded file is empty".into()));
    }
    if !file.looks_like_pdf() {
        return Err(AppError::Validation("only PDF files are supported".into()));
    }
    let job_description = job_description
        .filter(|jd| !jd.trim().is_empty())
        .ok_or_else(|| AppError::Validation("missing 'job_description' field".into()))?;

    // A scanned résumé with no text layer is still analyzed; the analyzer
    // answers it with an explanatory result.
    let resume_text = match state.pdf.extract(file.bytes.clone()).await {
        Ok(text) => text,
        Err(PdfError::NoText) => {
            warn!(user_id = %user.user_id, "no text extracted from uploaded PDF");
            String::new()
        }
        Err(e) => return Err(e.into()),
    };

    let file_name = sanitize_file_name(&file.name);
    let path = format!("resumes/{}/{}-{}", user.user_id, Uuid::new_v4(), file_name);
    let file_url = state
        .objects
        .put(&path, file.bytes, PDF_CONTENT_TYPE)
        .await?;

    let resume = ResumeRecord {
        user_id: user.user_id.clone(),
        file_url,
        file_name,
        status: STATUS_ACTIVE.to_string(),
    };
    let resume_id = state
        .documents
        .create(RESUMES_COLLECTION, serde_json::to_value(&resume).map_err(StorageError::from)?)
        .await?;

    let outcome = state
        .analyzer
        .analyze(&AnalysisRequest::new(resume_text, job_description.clone()))
        .await;
    info!(
        user_id = %user.user_id,
        %resume_id,
        source = ?outcome.source,
        match_score = outcome.result.match_score,
        "resume analyzed"
    );

    let record = AnalysisRecord {
        user_id: user.user_id,
        resume_id,
        job_description,
        result: outcome.result.clone(),
    };
    let analysis_id = state
        .documents
        .create(ANALYSES_COLLECTION, serde_json::to_value(&record).map_err(StorageError::from)?)
        .await?;

    Ok(Json(AnalyzeResponse {
        resume_id,
        analysis_id,
        result: outcome.result,
    }))
}

/// GET /api/v1/users/me/analyses
pub async fn handle_list_analyses(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<AnalysesResponse>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let (field, order) = params.sort.ordering();
    let query = DocumentQuery::new()
        .filter_eq("user_id", user.user_id)
        .order_by(field, order)
        .limit(limit);
    let docs = state.documents.query(ANALYSES_COLLECTION, &query).await?;
    Ok(Json(AnalysesResponse {
        analyses: docs.into_iter().map(stored).collect(),
    }))
}

/// GET /api/v1/users/me/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ResumesResponse>, AppError> {
    let query = DocumentQuery::new()
        .filter_eq("user_id", user.user_id)
        .filter_eq("status", STATUS_ACTIVE);
    let docs = state.documents.query(RESUMES_COLLECTION, &query).await?;
    Ok(Json(ResumesResponse {
        resumes: docs.into_iter().map(stored).collect(),
    }))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let doc = state
        .documents
        .get(RESUMES_COLLECTION, id)
        .await?
        .filter(|doc| doc.str_field("status") != Some(STATUS_DELETED))
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;

    if doc.str_field("user_id") != Some(user.user_id.as_str()) {
        warn!(user_id = %user.user_id, %id, "attempt to delete another user's resume");
        return Err(AppError::Forbidden);
    }

    // Soft delete: the record and its analyses stay, listings skip it.
    let patch = json!({ "status": STATUS_DELETED, "updated_at": Utc::now() });
    if !state.documents.update(RESUMES_COLLECTION, id, patch).await? {
        return Err(AppError::NotFound(format!("Resume {id} not found")));
    }
    info!(user_id = %user.user_id, %id, "resume deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, Response};
    use axum::Router;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::analysis::analyzer::tests::full_reply;
    use crate::analysis::analyzer::ResumeAnalyzer;
    use crate::analysis::cache::ResponseCache;
    use crate::analysis::prompts::PromptTier;
    use crate::auth::tests::{token_for, SECRET};
    use crate::auth::JwtVerifier;
    use crate::pdf::tests::sample_pdf;
    use crate::pdf::PdfExtractor;
    use crate::providers::scripted::ScriptedProvider;
    use crate::providers::ModelProvider;
    use crate::routes::build_router;
    use crate::storage::memory::{MemoryDocumentStore, MemoryObjectStore};
    use crate::storage::DocumentStore;

    const BOUNDARY: &str = "matcher-test-boundary";

    struct Harness {
        app: Router,
        documents: Arc<MemoryDocumentStore>,
        objects: Arc<MemoryObjectStore>,
        provider: Arc<ScriptedProvider>,
    }

    fn harness_with(objects: MemoryObjectStore) -> Harness {
        let documents = Arc::new(MemoryDocumentStore::new());
        let objects = Arc::new(objects);
        let provider = Arc::new(ScriptedProvider::replying(
            "scripted",
            PromptTier::Full,
            &full_reply(82),
        ));
        let cache = Arc::new(ResponseCache::new(
            Duration::from_secs(60),
            NonZeroUsize::new(8).unwrap(),
        ));
        let chain: Vec<Arc<dyn ModelProvider>> = vec![provider.clone()];
        let state = AppState {
            documents: documents.clone(),
            objects: objects.clone(),
            analyzer: Arc::new(ResumeAnalyzer::new(cache, chain, 3)),
            pdf: Arc::new(PdfExtractor::new(2)),
            verifier: Arc::new(JwtVerifier::new(SECRET)),
        };
        Harness {
            app: build_router(state),
            documents,
            objects,
            provider,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryObjectStore::new())
    }

    fn multipart_body(file: Option<(&str, &[u8])>, job_description: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some((name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(jd) = job_description {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"job_description\"\r\n\r\n{jd}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn analyze_request(user: &str, body: Vec<u8>) -> Request<Body> {
        Request::post("/api/v1/analyze")
            .header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn authed(method: &str, uri: &str, user: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)))
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn seed_resume(documents: &MemoryDocumentStore, user: &str, status: &str) -> Uuid {
        documents
            .create(
                RESUMES_COLLECTION,
                json!({"user_id": user, "file_url": "memory://x", "file_name": "cv.pdf", "status": status}),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_analyze_stores_resume_and_analysis() {
        let h = harness();
        let pdf = sample_pdf("Senior Rust engineer with Python and AWS experience");
        let body = multipart_body(Some(("my cv.pdf", pdf.as_slice())), Some("Job title: Backend Engineer"));

        let response = h.app.oneshot(analyze_request("user-1", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;

        assert!(json["resume_id"].is_string());
        assert!(json["analysis_id"].is_string());
        assert_eq!(json["result"]["match_score"], json!(82.0));
        assert_eq!(h.provider.calls(), 1);

        assert_eq!(h.documents.count(RESUMES_COLLECTION), 1);
        assert_eq!(h.documents.count(ANALYSES_COLLECTION), 1);

        let objects = h.objects.objects.lock();
        assert_eq!(objects.len(), 1);
        assert!(objects[0].0.starts_with("resumes/user-1/"));
        assert!(objects[0].0.ends_with("-my_cv.pdf"));
        assert_eq!(objects[0].2, PDF_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_analyze_requires_auth() {
        let h = harness();
        let request = Request::post("/api/v1/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(None, Some("jd"))))
            .unwrap();
        let response = h.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_analyze_validates_fields() {
        let h = harness();
        let pdf = sample_pdf("Rust");

        let missing_jd = multipart_body(Some(("cv.pdf", pdf.as_slice())), Some("   "));
        let response = h.app.clone().oneshot(analyze_request("u", missing_jd)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let missing_file = multipart_body(None, Some("Rust developer"));
        let response = h.app.clone().oneshot(analyze_request("u", missing_file)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let not_pdf = multipart_body(Some(("notes.txt", b"plain text".as_slice())), Some("Rust developer"));
        let request = Request::post("/api/v1/analyze")
            .header(header::AUTHORIZATION, format!("Bearer {}", token_for("u")))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(
                String::from_utf8(not_pdf)
                    .unwrap()
                    .replace("Content-Type: application/pdf", "Content-Type: text/plain"),
            ))
            .unwrap();
        let response = h.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(h.documents.count(RESUMES_COLLECTION), 0);
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_analyze_rejects_unreadable_pdf() {
        let h = harness();
        let body = multipart_body(Some(("cv.pdf", b"%PDF-1.4 truncated".as_slice())), Some("Rust developer"));
        let response = h.app.oneshot(analyze_request("u", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(h.objects.objects.lock().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_surfaces_storage_failure() {
        let h = harness_with(MemoryObjectStore::failing());
        let pdf = sample_pdf("Rust developer");
        let body = multipart_body(Some(("cv.pdf", pdf.as_slice())), Some("Rust developer"));
        let response = h.app.oneshot(analyze_request("u", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"]["code"], "STORAGE_ERROR");
        assert_eq!(h.documents.count(RESUMES_COLLECTION), 0);
    }

    #[tokio::test]
    async fn test_list_analyses_newest_first_with_limit() {
        let h = harness();
        for score in [10, 20, 30] {
            h.documents
                .create(ANALYSES_COLLECTION, json!({"user_id": "u1", "match_score": score}))
                .await
                .unwrap();
        }
        h.documents
            .create(ANALYSES_COLLECTION, json!({"user_id": "u2", "match_score": 99}))
            .await
            .unwrap();

        let response = h
            .app
            .oneshot(authed("GET", "/api/v1/users/me/analyses?limit=2", "u1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        let scores: Vec<Value> = json["analyses"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["match_score"].clone())
            .collect();
        assert_eq!(scores, vec![json!(30), json!(20)]);
        assert!(json["analyses"][0]["id"].is_string());
        assert!(json["analyses"][0]["created_at"].is_string());
    }

    #[tokio::test]
    async fn test_list_analyses_sort_options() {
        let h = harness();
        for score in [40, 90, 10] {
            h.documents
                .create(ANALYSES_COLLECTION, json!({"user_id": "u1", "match_score": score}))
                .await
                .unwrap();
        }

        let cases = [
            ("oldest", vec![40, 90, 10]),
            ("newest", vec![10, 90, 40]),
            ("highest_score", vec![90, 40, 10]),
            ("lowest_score", vec![10, 40, 90]),
        ];
        for (sort, expected) in cases {
            let uri = format!("/api/v1/users/me/analyses?sort={sort}");
            let response = h.app.clone().oneshot(authed("GET", &uri, "u1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json = json_body(response).await;
            let scores: Vec<i64> = json["analyses"]
                .as_array()
                .unwrap()
                .iter()
                .map(|a| a["match_score"].as_i64().unwrap())
                .collect();
            assert_eq!(scores, expected, "sort={sort}");
        }

        let response = h
            .app
            .oneshot(authed("GET", "/api/v1/users/me/analyses?sort=random", "u1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_resumes_skips_deleted() {
        let h = harness();
        let active = seed_resume(&h.documents, "u1", STATUS_ACTIVE).await;
        seed_resume(&h.documents, "u1", STATUS_DELETED).await;
        seed_resume(&h.documents, "u2", STATUS_ACTIVE).await;

        let response = h
            .app
            .oneshot(authed("GET", "/api/v1/users/me/resumes", "u1"))
            .await
            .unwrap();
        let json = json_body(response).await;
        let resumes = json["resumes"].as_array().unwrap();
        assert_eq!(resumes.len(), 1);
        assert_eq!(resumes[0]["id"], json!(active.to_string()));
    }

    #[tokio::test]
    async fn test_delete_resume_is_owner_only_soft_delete() {
        let h = harness();
        let id = seed_resume(&h.documents, "owner", STATUS_ACTIVE).await;
        let uri = format!("/api/v1/resumes/{id}");

        let response = h.app.clone().oneshot(authed("DELETE", &uri, "intruder")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = h.app.clone().oneshot(authed("DELETE", &uri, "owner")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let doc = h.documents.get(RESUMES_COLLECTION, id).await.unwrap().unwrap();
        assert_eq!(doc.str_field("status"), Some(STATUS_DELETED));
        assert!(doc.data.get("updated_at").is_some());

        let response = h.app.clone().oneshot(authed("DELETE", &uri, "owner")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let missing = format!("/api/v1/resumes/{}", Uuid::new_v4());
        let response = h.app.oneshot(authed("DELETE", &missing, "owner")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("My CV (final).pdf"), "My_CV__final_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\cv.pdf"), "cv.pdf");
        assert_eq!(sanitize_file_name(".."), "resume.pdf");
    }
}
