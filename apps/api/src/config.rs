use anyhow::{bail, Context, Result};

/// One year. Keeps `now + ttl` well inside the range chrono can represent.
const MAX_JWT_EXPIRE_MINUTES: i64 = 60 * 24 * 365;

/// Application configuration loaded from environment variables.
/// Built once at startup and handed to the components that need it.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    pub jwt_algorithm: String,
    pub jwt_expire_minutes: i64,
    pub cors_origins: Vec<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let jwt_expire_minutes = parse_expire_minutes(
            &std::env::var("JWT_EXPIRE_MINUTES").unwrap_or_else(|_| "30".to_string()),
        )?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            secret_key: require_env("SECRET_KEY")?,
            jwt_algorithm: std::env::var("ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
            jwt_expire_minutes,
            cors_origins: parse_origins(
                &std::env::var("BACKEND_CORS_ORIGINS").unwrap_or_default(),
            ),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

// Keeps SECRET_KEY out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expire_minutes", &self.jwt_expire_minutes)
            .field("cors_origins", &self.cors_origins)
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_expire_minutes(raw: &str) -> Result<i64> {
    let minutes = raw
        .trim()
        .parse::<i64>()
        .context("JWT_EXPIRE_MINUTES must be an integer")?;
    if minutes <= 0 || minutes > MAX_JWT_EXPIRE_MINUTES {
        bail!("JWT_EXPIRE_MINUTES must be between 1 and {MAX_JWT_EXPIRE_MINUTES}, got {minutes}");
    }
    Ok(minutes)
}

/// Splits a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
