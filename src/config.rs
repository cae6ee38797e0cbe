use serde::Deserialize;
use time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

impl JwtConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::minutes(self.session_ttl_minutes)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_name: String,
    pub from_address: String,
    pub tls: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub frontend_origin: String,
    pub cookie_secure: bool,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "studentbase".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "studentbase-users".into()),
            session_ttl_minutes: std::env::var("JWT_SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
            reset_ttl_minutes: std::env::var("JWT_RESET_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(10),
        };
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST")?,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            from_name: std::env::var("SMTP_FROM_NAME")
                .unwrap_or_else(|_| "Student Portal".into()),
            from_address: std::env::var("SMTP_FROM_ADDRESS")?,
            tls: std::env::var("SMTP_TLS").map(|v| v != "false").unwrap_or(true),
        };
        Ok(Self {
            database_url,
            frontend_origin: std::env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| v == "true")
                .unwrap_or(false),
            jwt,
            smtp,
        })
    }
}
