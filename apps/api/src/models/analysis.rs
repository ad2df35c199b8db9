use serde::{Deserialize, Serialize};

/// Sentinel job title used whenever none could be extracted.
pub const UNKNOWN_POSITION: &str = "Unknown Position";

/// Résumé text is cut to this many characters before it reaches any model.
pub const MAX_RESUME_CHARS: usize = 8000;
/// Job description text is cut to this many characters before it reaches any model.
pub const MAX_JOB_DESCRIPTION_CHARS: usize = 2000;
/// Appended to any text that was cut.
pub const TRUNCATION_MARKER: &str = "...";

pub const MAX_SKILLS: usize = 10;
pub const MAX_IMPROVEMENT_AREAS: usize = 5;
pub const MAX_RECOMMENDATIONS: usize = 5;
pub const MAX_ATS_TIPS: usize = 5;
pub const OVERALL_ASSESSMENT_LEN: usize = 5;
pub const MAX_ISSUE_COUNT: u8 = 15;

// ────────────────────────────────────────────────────────────────────────────
// Request
// ────────────────────────────────────────────────────────────────────────────

/// One résumé/job-description pair to analyze. Built once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    resume_text: String,
    job_description: String,
}

impl AnalysisRequest {
    pub fn new(resume_text: impl Into<String>, job_description: impl Into<String>) -> Self {
        Self {
            resume_text: resume_text.into(),
            job_description: job_description.into(),
        }
    }

    pub fn resume_text(&self) -> &str {
        &self.resume_text
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    /// Returns a copy bounded to the model input limits. Cut texts end with `...`.
    pub fn truncated(&self) -> Self {
        Self {
            resume_text: truncate_chars(&self.resume_text, MAX_RESUME_CHARS),
            job_description: truncate_chars(&self.job_description, MAX_JOB_DESCRIPTION_CHARS),
        }
    }
}

/// Cuts `text` to at most `max_chars` characters, appending the truncation marker when cut.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{TRUNCATION_MARKER}", &text[..byte_idx]),
        None => text.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Result
// ────────────────────────────────────────────────────────────────────────────

/// The canonical analysis output. Every value handed back by the analyzer
/// satisfies the field contract (ranges, lengths, nested defaults).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 0 – 100
    pub match_score: f64,
    pub feedback: String,
    /// At most 10, in model order.
    pub skills_match: Vec<String>,
    /// At most 5, in model order.
    pub improvement_areas: Vec<String>,
    pub job_title: String,

    // Issue counts, 0 – 15 each.
    pub searchability_issues: u8,
    pub hard_skills_issues: u8,
    pub soft_skills_issues: u8,
    pub recruiter_tips_issues: u8,
    pub formatting_issues: u8,

    // Percentages, 0 – 100 each.
    pub keywords_match_percentage: f64,
    pub experience_level_percentage: f64,
    pub skills_relevance_percentage: f64,

    pub industry_insights: IndustryInsights,
    pub formatting_checks: FormattingChecks,

    /// Exactly 5 observations when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_assessment: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ats_tips: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryInsights {
    pub industry: String,
    pub title: String,
    /// At most 5.
    pub recommendations: Vec<String>,
}

impl IndustryInsights {
    pub fn general() -> Self {
        Self {
            industry: "General".to_string(),
            title: "General Resume Recommendations".to_string(),
            recommendations: strings(&[
                "Tailor your resume to match the specific job description",
                "Quantify achievements with specific metrics when possible",
                "Use action verbs to begin bullet points",
                "Include relevant keywords from the job description",
                "Ensure your resume is ATS-friendly with a clean format",
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattingChecks {
    pub font_check: FormatCheck,
    pub layout_check: FormatCheck,
    pub page_setup_check: FormatCheck,
}

impl FormattingChecks {
    /// Generic ATS formatting guidance, every check marked with `passed`.
    pub fn standard(passed: bool) -> Self {
        Self {
            font_check: FormatCheck {
                passed,
                details: default_font_details(),
            },
            layout_check: FormatCheck {
                passed,
                details: default_layout_details(),
            },
            page_setup_check: FormatCheck {
                passed,
                details: default_page_setup_details(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatCheck {
    pub passed: bool,
    pub details: Vec<String>,
}

pub fn default_font_details() -> Vec<String> {
    strings(&[
        "Use standard fonts like Arial, Calibri, or Times New Roman for best ATS compatibility",
        "Keep font size between 10-12pt for body text",
        "Use consistent font styling throughout your resume",
    ])
}

pub fn default_layout_details() -> Vec<String> {
    strings(&[
        "Use a single-column layout for better ATS readability",
        "Avoid tables, text boxes, and complex formatting",
        "Use standard section headings like 'Experience' and 'Education'",
    ])
}

pub fn default_page_setup_details() -> Vec<String> {
    strings(&[
        "Use standard margins (0.5-1 inch)",
        "Save your resume as a PDF file",
        "Keep your resume to 1-2 pages maximum",
    ])
}

pub fn default_overall_assessment() -> Vec<String> {
    strings(&[
        "Your resume could benefit from better alignment with the target job description.",
        "The format and structure of your resume may need improvement for ATS compatibility.",
        "Your experience section could be enhanced with more quantifiable achievements.",
        "Consider adding more relevant keywords from the job description.",
        "The overall presentation could be improved for better readability by recruiters.",
    ])
}

pub fn default_ats_tips() -> Vec<String> {
    strings(&[
        "Use standard fonts like Arial, Calibri, or Times New Roman for better ATS parsing",
        "Avoid tables, columns, and text boxes which can confuse ATS software",
        "Include exact keywords from the job description to improve your match score",
        "Use standard section headings like 'Experience', 'Education', and 'Skills'",
        "Save your resume as a text-based PDF for optimal compatibility",
    ])
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
