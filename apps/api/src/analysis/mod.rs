//! Résumé / job-description analysis: prompt tiers, provider fallback,
//! response repair and normalization into [`AnalysisResult`](crate::models::analysis::AnalysisResult).

pub mod analyzer;
pub mod cache;
pub mod fallback;
pub mod handlers;
pub mod normalizer;
pub mod prompts;
pub mod repair;
