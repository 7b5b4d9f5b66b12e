use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Absent means the in-memory store is used.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub app_host: String,
    pub app_port: u16,
    /// Built client bundle served for every non-API route.
    pub client_dist: Option<PathBuf>,
    pub cors_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "bookshelf".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "bookshelf-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(120),
        };
        let app_port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3001);
        Ok(Self {
            database_url,
            jwt,
            app_host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            app_port,
            client_dist: std::env::var("CLIENT_DIST").ok().map(PathBuf::from),
            cors_origin: std::env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
        })
    }
}
