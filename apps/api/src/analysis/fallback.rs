//! Deterministic results built without any model.
//!
//! `heuristic_result` stands in when no provider produced a usable answer: it
//! intersects a fixed skill vocabulary with both texts. `error_result` is the
//! clearly-marked degraded answer (score 0) for input that cannot be analyzed.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::analysis::{
    default_ats_tips, strings, AnalysisRequest, AnalysisResult, FormattingChecks,
    IndustryInsights, MAX_SKILLS, UNKNOWN_POSITION,
};

pub const HEURISTIC_SCORE: f64 = 60.0;
const HEURISTIC_ISSUES: u8 = 5;
/// Extracted job titles are cut to this many words.
const MAX_TITLE_WORDS: usize = 6;

pub const SKILL_VOCABULARY: &[&str] = &[
    "python",
    "java",
    "javascript",
    "typescript",
    "react",
    "angular",
    "vue",
    "node",
    "express",
    "django",
    "flask",
    "sql",
    "nosql",
    "mongodb",
    "postgres",
    "mysql",
    "aws",
    "azure",
    "gcp",
    "docker",
    "kubernetes",
    "ci/cd",
    "git",
    "agile",
    "scrum",
    "product management",
    "project management",
    "leadership",
    "communication",
    "problem solving",
    "critical thinking",
    "data analysis",
    "machine learning",
    "ai",
    "nlp",
    "computer vision",
    "data science",
    "ui/ux",
    "design",
    "photoshop",
    "illustrator",
    "figma",
    "sketch",
    "html",
    "css",
    "sass",
    "less",
    "swift",
    "kotlin",
    "objective-c",
    "flutter",
    "react native",
    "mobile development",
];

/// One case-insensitive, word-bounded pattern per vocabulary entry, in vocabulary order.
static SKILL_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SKILL_VOCABULARY
        .iter()
        .filter_map(|skill| {
            Regex::new(&format!(r"(?i)\b{}\b", regex::escape(skill)))
                .ok()
                .map(|re| (*skill, re))
        })
        .collect()
});

static JOB_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)\b(?:(?:job title|position|role)\s*:|hiring for)\s*([A-Za-z0-9][A-Za-z0-9 /&+\-]{1,60})",
    )
    .expect("invalid job title pattern")
});

const HEURISTIC_FEEDBACK: &str = "Your resume contains some relevant skills for this position. \
    Consider tailoring it more specifically to the job description and quantifying your \
    achievements with metrics.";

fn heuristic_improvements() -> Vec<String> {
    strings(&[
        "Tailor your resume specifically to this job description",
        "Quantify your achievements with metrics and numbers",
        "Use action verbs to begin your bullet points",
        "Ensure your most relevant experience is prominently displayed",
        "Add a concise professional summary at the top of your resume",
    ])
}

fn error_improvements() -> Vec<String> {
    strings(&[
        "Unable to analyze your resume properly. Please try again with a cleaner PDF format.",
        "Consider using standard resume templates that are ATS-friendly.",
        "Simplify complex formatting like tables, columns, and text boxes which may interfere with analysis.",
        "Ensure your resume follows a clear structure with standard section headings.",
        "Try reducing the overall length of your resume if it exceeds 2-3 pages.",
    ])
}

fn error_assessment() -> Vec<String> {
    strings(&[
        "Your resume contains formatting that may be challenging for ATS systems to parse correctly.",
        "The file format or content structure caused issues during automated analysis.",
        "Key sections may be missing or not clearly identified in your resume.",
        "Consider using a standard chronological or functional resume format.",
        "Ensure your contact information is clearly visible at the top of your resume.",
    ])
}

/// Vocabulary skills present in both texts, vocabulary order, at most [`MAX_SKILLS`].
pub fn matched_skills(resume_text: &str, job_description: &str) -> Vec<String> {
    SKILL_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(resume_text) && re.is_match(job_description))
        .map(|(skill, _)| skill.to_string())
        .take(MAX_SKILLS)
        .collect()
}

/// Job title from a `Job title:` / `Position:` / `Role:` / `Hiring for` line.
pub fn extract_job_title(job_description: &str) -> Option<String> {
    let captured = JOB_TITLE.captures(job_description)?.get(1)?.as_str();
    let title = captured
        .split_whitespace()
        .take(MAX_TITLE_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    (!title.is_empty()).then_some(title)
}

pub fn heuristic_result(request: &AnalysisRequest) -> AnalysisResult {
    let skills_match = matched_skills(request.resume_text(), request.job_description());
    let job_title = extract_job_title(request.job_description())
        .unwrap_or_else(|| UNKNOWN_POSITION.to_string());

    AnalysisResult {
        match_score: HEURISTIC_SCORE,
        feedback: HEURISTIC_FEEDBACK.to_string(),
        skills_match,
        improvement_areas: heuristic_improvements(),
        job_title,
        searchability_issues: HEURISTIC_ISSUES,
        hard_skills_issues: HEURISTIC_ISSUES,
        soft_skills_issues: HEURISTIC_ISSUES,
        recruiter_tips_issues: HEURISTIC_ISSUES,
        formatting_issues: HEURISTIC_ISSUES,
        keywords_match_percentage: HEURISTIC_SCORE,
        experience_level_percentage: HEURISTIC_SCORE,
        skills_relevance_percentage: HEURISTIC_SCORE,
        industry_insights: IndustryInsights::general(),
        formatting_checks: FormattingChecks::standard(true),
        overall_assessment: None,
        ats_tips: None,
    }
}

/// Score-0 result whose feedback names `reason`.
pub fn error_result(reason: &str) -> AnalysisResult {
    AnalysisResult {
        match_score: 0.0,
        feedback: format!(
            "Error: {reason}. Please try again with a simpler resume or job description."
        ),
        skills_match: Vec::new(),
        improvement_areas: error_improvements(),
        job_title: UNKNOWN_POSITION.to_string(),
        searchability_issues: 5,
        hard_skills_issues: 3,
        soft_skills_issues: 2,
        recruiter_tips_issues: 4,
        formatting_issues: 3,
        keywords_match_percentage: 10.0,
        experience_level_percentage: 0.0,
        skills_relevance_percentage: 5.0,
        industry_insights: IndustryInsights::general(),
        formatting_checks: FormattingChecks::standard(false),
        overall_assessment: Some(error_assessment()),
        ats_tips: Some(default_ats_tips()),
    }
}
