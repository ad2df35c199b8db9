// Prompt constants and the tiered prompt builder for résumé analysis.
// Every tier embeds the literal schema the model must fill in.

use serde::Serialize;

use crate::models::analysis::AnalysisRequest;

/// How much structured detail a prompt asks the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTier {
    /// Issue counts, percentages, industry insights, formatting checks, assessment, ATS tips.
    Full,
    /// Score, feedback, skills, improvement areas and job title.
    Simplified,
    /// Score, feedback, skills and improvement areas only.
    Minimal,
}

impl PromptTier {
    /// Top-level keys a response must carry to be accepted for this tier.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            PromptTier::Full => &[
                "match_score",
                "feedback",
                "skills_match",
                "improvement_areas",
                "job_title",
                "industry_insights",
            ],
            PromptTier::Simplified => &[
                "match_score",
                "feedback",
                "skills_match",
                "improvement_areas",
                "job_title",
            ],
            PromptTier::Minimal => &["match_score", "feedback", "skills_match", "improvement_areas"],
        }
    }

    fn schema(self) -> &'static str {
        match self {
            PromptTier::Full => FULL_SCHEMA,
            PromptTier::Simplified => SIMPLIFIED_SCHEMA,
            PromptTier::Minimal => MINIMAL_SCHEMA,
        }
    }

    fn instructions(self) -> &'static str {
        match self {
            PromptTier::Full => FULL_INSTRUCTIONS,
            PromptTier::Simplified | PromptTier::Minimal => BASIC_INSTRUCTIONS,
        }
    }
}

/// A rendered prompt: a system message plus the user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// System prompt shared by every tier.
pub const ANALYSIS_SYSTEM: &str = "You are an expert resume analyzer with deep knowledge of \
    Applicant Tracking Systems (ATS), industry trends, and job market requirements. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Output rules appended to every user prompt.
pub const JSON_OUTPUT_RULES: &str = "\
THE RESPONSE MUST BE A VALID JSON OBJECT WITH NO SYNTAX ERRORS.
Use proper JSON formatting: every key in double quotes, commas between key-value pairs, \
and the JSON literals true/false/null (never True/False/None).
Do NOT wrap the JSON in markdown fences such as ```json and do NOT add any text before or after it.
Respond with ONLY a JSON object in exactly this format:";

const FULL_INSTRUCTIONS: &str = "\
1. Analyze the resume content and job description thoroughly
2. Extract the job title from the job description
3. Identify matching skills between the resume and job description
4. Provide personalized and specific improvement areas tailored to this exact resume and job
5. Create industry-specific insights based on current trends and best practices
6. Pay special attention to Applicant Tracking System (ATS) optimization techniques
7. Analyze the resume formatting for ATS compatibility and readability
8. Provide specific feedback on font, layout, and page setup
9. Give an overall assessment with exactly 5 key observations about the resume";

const BASIC_INSTRUCTIONS: &str = "\
1. Analyze the resume content and job description thoroughly
2. Extract the job title from the job description
3. Identify matching skills between the resume and job description
4. Provide personalized improvement areas tailored to this resume and job";

pub const FULL_SCHEMA: &str = r#"{
  "match_score": <number 0-100>,
  "feedback": "<2-sentence summary followed by 4-6 specific points as complete sentences>",
  "skills_match": ["<skill1>", "<skill2>"],
  "improvement_areas": ["<specific suggestion1>", "<specific suggestion2>"],
  "overall_assessment": [
    "<key observation 1>",
    "<key observation 2>",
    "<key observation 3>",
    "<key observation 4>",
    "<key observation 5>"
  ],
  "searchability_issues": <number of issues 0-15>,
  "hard_skills_issues": <number of issues 0-15>,
  "soft_skills_issues": <number of issues 0-15>,
  "recruiter_tips_issues": <number of issues 0-15>,
  "formatting_issues": <number of issues 0-15>,
  "keywords_match_percentage": <number 0-100>,
  "experience_level_percentage": <number 0-100>,
  "skills_relevance_percentage": <number 0-100>,
  "job_title": "<extracted job title>",
  "ats_tips": ["<ATS tip 1>", "<ATS tip 2>", "<ATS tip 3>", "<ATS tip 4>", "<ATS tip 5>"],
  "industry_insights": {
    "industry": "<industry name>",
    "title": "<title for industry insights>",
    "recommendations": ["<recommendation 1>", "<recommendation 2>", "<recommendation 3>"]
  },
  "formatting_checks": {
    "font_check": {"passed": <true or false>, "details": ["<observation 1>", "<observation 2>", "<observation 3>"]},
    "layout_check": {"passed": <true or false>, "details": ["<observation 1>", "<observation 2>", "<observation 3>"]},
    "page_setup_check": {"passed": <true or false>, "details": ["<observation 1>", "<observation 2>", "<observation 3>"]}
  }
}"#;

pub const SIMPLIFIED_SCHEMA: &str = r#"{
  "match_score": <number 0-100>,
  "feedback": "<2-3 sentences of specific feedback>",
  "skills_match": ["<skill1>", "<skill2>"],
  "improvement_areas": ["<area1>", "<area2>"],
  "job_title": "<extracted job title>"
}"#;

pub const MINIMAL_SCHEMA: &str = r#"{
  "match_score": <number 0-100>,
  "feedback": "<2-3 sentences of specific feedback>",
  "skills_match": ["<skill1>", "<skill2>"],
  "improvement_areas": ["<area1>", "<area2>"]
}"#;

/// Builds the prompt for `tier`. Input texts are bounded to the model limits first.
pub fn build_prompt(request: &AnalysisRequest, tier: PromptTier) -> Prompt {
    let bounded = request.truncated();
    let user = format!(
        "Analyze this resume against the job description.\n\n\
         INSTRUCTIONS:\n{instructions}\n\n\
         RESUME:\n{resume}\n\n\
         JOB DESCRIPTION:\n{job}\n\n\
         {rules}\n{schema}",
        instructions = tier.instructions(),
        resume = bounded.resume_text(),
        job = bounded.job_description(),
        rules = JSON_OUTPUT_RULES,
        schema = tier.schema(),
    );

    Prompt {
        system: ANALYSIS_SYSTEM.to_string(),
        user,
    }
}
