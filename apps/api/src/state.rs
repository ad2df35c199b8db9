use std::sync::Arc;

use crate::analysis::analyzer::ResumeAnalyzer;
use crate::auth::TokenVerifier;
use crate::pdf::PdfExtractor;
use crate::storage::{DocumentStore, ObjectStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<dyn DocumentStore>,
    /// Résumé PDFs.
    pub objects: Arc<dyn ObjectStore>,
    pub analyzer: Arc<ResumeAnalyzer>,
    pub pdf: Arc<PdfExtractor>,
    pub verifier: Arc<dyn TokenVerifier>,
}
