use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    /// Base URL stored résumé files are served from. Defaults to `{endpoint}/{bucket}`.
    pub s3_public_base_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub jwt_secret: String,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    pub max_provider_attempts: usize,
    pub pdf_max_workers: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3_bucket = require_env("S3_BUCKET")?;
        let s3_endpoint = require_env("S3_ENDPOINT")?;
        let s3_public_base_url = optional_env("S3_PUBLIC_BASE_URL").unwrap_or_else(|| {
            format!("{}/{}", s3_endpoint.trim_end_matches('/'), s3_bucket)
        });

        let config = Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket,
            s3_endpoint,
            s3_public_base_url,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            jwt_secret: require_env("JWT_SECRET")?,
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            cache_ttl: Duration::from_secs(parse_env("CACHE_TTL_SECS", 86_400)?),
            cache_max_entries: parse_env("CACHE_MAX_ENTRIES", 1024)?,
            max_provider_attempts: parse_env("MAX_PROVIDER_ATTEMPTS", 3)?,
            pdf_max_workers: parse_env("PDF_MAX_WORKERS", 4)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.gemini_api_key.is_none()
            && self.openai_api_key.is_none()
            && self.anthropic_api_key.is_none()
        {
            bail!("At least one of GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY must be set");
        }
        if self.cache_max_entries == 0 {
            bail!("CACHE_MAX_ENTRIES must be greater than zero");
        }
        if self.max_provider_attempts == 0 {
            bail!("MAX_PROVIDER_ATTEMPTS must be greater than zero");
        }
        Ok(())
    }
}

// Secrets never reach the logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |set: bool| if set { "<set>" } else { "<unset>" };
        f.debug_struct("Config")
            .field("database_url", &"<redacted>")
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("s3_public_base_url", &self.s3_public_base_url)
            .field("aws_access_key_id", &"<redacted>")
            .field("aws_secret_access_key", &"<redacted>")
            .field("jwt_secret", &"<redacted>")
            .field("gemini_api_key", &redact(self.gemini_api_key.is_some()))
            .field("openai_api_key", &redact(self.openai_api_key.is_some()))
            .field("anthropic_api_key", &redact(self.anthropic_api_key.is_some()))
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_max_entries", &self.cache_max_entries)
            .field("max_provider_attempts", &self.max_provider_attempts)
            .field("pdf_max_workers", &self.pdf_max_workers)
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values both count as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
