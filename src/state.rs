use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    auth::{password, TokenService},
    config::{AppConfig, JwtConfig},
    graphql::{build_schema, BookSchema},
    users::{MemoryUserStore, PgUserStore, UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn UserStore>,
    pub tokens: TokenService,
    pub schema: BookSchema,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        password::warm_up();

        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(PgUserStore::new(db))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; users are kept in memory");
                Arc::new(MemoryUserStore::new())
            }
        };

        let tokens = TokenService::from_config(&config.jwt);
        Ok(Self::from_parts(config, store, tokens))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>, tokens: TokenService) -> Self {
        let schema = build_schema(store.clone(), tokens.clone());
        Self {
            config,
            store,
            tokens,
            schema,
        }
    }

    /// In-memory state with a throwaway secret.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 120,
            },
            app_host: "127.0.0.1".into(),
            app_port: 0,
            client_dist: None,
            cors_origin: None,
        });
        let tokens = TokenService::from_config(&config.jwt);
        Self::from_parts(config, Arc::new(MemoryUserStore::new()), tokens)
    }
}
