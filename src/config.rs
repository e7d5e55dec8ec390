use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub oauth: OAuthConfig,
    /// Subject id of the single global admin.
    pub admin_id: String,
    pub frontend_url: String,
    pub cookie_secure: bool,
    pub deny_list_extra: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "listings".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "listings-users".into()),
            ttl_hours: std::env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(720),
        };
        let oauth = OAuthConfig {
            client_id: std::env::var("GOOGLE_CLIENT_ID").context("GOOGLE_CLIENT_ID")?,
            client_secret: std::env::var("GOOGLE_CLIENT_SECRET").context("GOOGLE_CLIENT_SECRET")?,
            redirect_url: std::env::var("GOOGLE_REDIRECT_URL").unwrap_or_else(|_| {
                "http://localhost:8080/api/v1/auth/google/callback".into()
            }),
        };
        let admin_id = std::env::var("ADMIN_ID").context("ADMIN_ID")?;
        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let cookie_secure = std::env::var("COOKIE_SECURE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let deny_list_extra = std::env::var("DENY_LIST_EXTRA")
            .map(|v| parse_list(&v))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            jwt,
            oauth,
            admin_id,
            frontend_url,
            cookie_secure,
            deny_list_extra,
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
