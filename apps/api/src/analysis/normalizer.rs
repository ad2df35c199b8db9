//! Schema normalizer.
//!
//! `normalize` is total: any JSON value goes in, a result satisfying the full
//! field contract comes out. Missing fields take their defaults, mistyped fields
//! are coerced where a reading is obvious (`"85"`, `"85%"`, `"true"`, a lone
//! string where a list is expected), numbers are clamped, lists are cut to their
//! caps keeping the model's order.

use serde_json::{Map, Value};

use crate::models::analysis::{
    default_font_details, default_layout_details, default_overall_assessment,
    default_page_setup_details, AnalysisResult, FormatCheck, FormattingChecks, IndustryInsights,
    MAX_ATS_TIPS, MAX_IMPROVEMENT_AREAS, MAX_ISSUE_COUNT, MAX_RECOMMENDATIONS, MAX_SKILLS,
    OVERALL_ASSESSMENT_LEN, UNKNOWN_POSITION,
};

pub const DEFAULT_FEEDBACK: &str = "No specific feedback available.";

pub fn normalize(partial: &Value) -> AnalysisResult {
    let empty = Map::new();
    let fields = partial.as_object().unwrap_or(&empty);
    let get = |key: &str| fields.get(key);

    let match_score = get("match_score").and_then(number).map_or(0.0, percent);
    let percentage = |key: &str| get(key).and_then(number).map_or(match_score, percent);
    let issues = |key: &str| get(key).and_then(number).map_or(0, issue_count);

    AnalysisResult {
        match_score,
        feedback: get("feedback")
            .and_then(text)
            .unwrap_or_else(|| DEFAULT_FEEDBACK.to_string()),
        skills_match: capped(get("skills_match").and_then(string_list), MAX_SKILLS),
        improvement_areas: capped(
            get("improvement_areas").and_then(string_list),
            MAX_IMPROVEMENT_AREAS,
        ),
        job_title: get("job_title")
            .and_then(text)
            .unwrap_or_else(|| UNKNOWN_POSITION.to_string()),

        searchability_issues: issues("searchability_issues"),
        hard_skills_issues: issues("hard_skills_issues"),
        soft_skills_issues: issues("soft_skills_issues"),
        recruiter_tips_issues: issues("recruiter_tips_issues"),
        formatting_issues: issues("formatting_issues"),

        keywords_match_percentage: percentage("keywords_match_percentage"),
        experience_level_percentage: percentage("experience_level_percentage"),
        skills_relevance_percentage: percentage("skills_relevance_percentage"),

        industry_insights: industry_insights(get("industry_insights")),
        formatting_checks: formatting_checks(get("formatting_checks")),

        overall_assessment: get("overall_assessment")
            .and_then(string_list)
            .map(exactly_five),
        ats_tips: get("ats_tips")
            .and_then(string_list)
            .map(|tips| capped(Some(tips), MAX_ATS_TIPS)),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Nested objects
// ────────────────────────────────────────────────────────────────────────────

fn industry_insights(value: Option<&Value>) -> IndustryInsights {
    let general = IndustryInsights::general();
    let Some(fields) = value.and_then(Value::as_object) else {
        return general;
    };

    let recommendations = fields
        .get("recommendations")
        .and_then(string_list)
        .filter(|recs| !recs.is_empty())
        .unwrap_or(general.recommendations);

    IndustryInsights {
        industry: fields
            .get("industry")
            .and_then(text)
            .unwrap_or(general.industry),
        title: fields.get("title").and_then(text).unwrap_or(general.title),
        recommendations: capped(Some(recommendations), MAX_RECOMMENDATIONS),
    }
}

fn formatting_checks(value: Option<&Value>) -> FormattingChecks {
    let Some(fields) = value.and_then(Value::as_object) else {
        return FormattingChecks::standard(true);
    };

    FormattingChecks {
        font_check: format_check(fields.get("font_check"), default_font_details),
        layout_check: format_check(fields.get("layout_check"), default_layout_details),
        page_setup_check: format_check(fields.get("page_setup_check"), default_page_setup_details),
    }
}

fn format_check(value: Option<&Value>, default_details: fn() -> Vec<String>) -> FormatCheck {
    let fields = value.and_then(Value::as_object);
    let passed = fields
        .and_then(|f| f.get("passed"))
        .and_then(boolean)
        .unwrap_or(true);
    let details = fields
        .and_then(|f| f.get("details"))
        .and_then(string_list)
        .filter(|details| !details.is_empty())
        .unwrap_or_else(default_details);

    FormatCheck { passed, details }
}

// ────────────────────────────────────────────────────────────────────────────
// Coercions
// ────────────────────────────────────────────────────────────────────────────

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn percent(n: f64) -> f64 {
    n.clamp(0.0, 100.0)
}

fn issue_count(n: f64) -> u8 {
    n.round().clamp(0.0, f64::from(MAX_ISSUE_COUNT)) as u8
}

fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(x) if x == 0.0 => Some(false),
            Some(x) if x == 1.0 => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "passed" | "pass" => Some(true),
            "false" | "no" | "failed" | "fail" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Non-empty trimmed text. Numbers and bools are rendered.
fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// A list of strings. A lone string becomes a one-element list; unusable items are skipped.
fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(text).collect()),
        Value::String(_) => text(value).map(|s| vec![s]),
        _ => None,
    }
}

fn capped(list: Option<Vec<String>>, max: usize) -> Vec<String> {
    let mut list = list.unwrap_or_default();
    list.truncate(max);
    list
}

/// Cuts to five, then pads from the default observations.
fn exactly_five(mut list: Vec<String>) -> Vec<String> {
    list.truncate(OVERALL_ASSESSMENT_LEN);
    let missing = OVERALL_ASSESSMENT_LEN - list.len();
    list.extend(default_overall_assessment().into_iter().take(missing));
    list
}
