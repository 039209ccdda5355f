use crate::config::{AppConfig, StoreBackend};
use crate::store::{MemoryStore, PgStore, RecordStore};
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL not set")?;
                let pg = PgStore::connect(url, config.max_connections).await?;

                // Run migrations if present
                if let Err(e) = sqlx::migrate!("./migrations").run(pg.pool()).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                tracing::info!(max_connections = config.max_connections, "postgres store ready");
                Arc::new(pg) as Arc<dyn RecordStore>
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on exit");
                Arc::new(MemoryStore::new()) as Arc<dyn RecordStore>
            }
        };

        Ok(Self { store, config })
    }

    pub fn from_parts(store: Arc<dyn RecordStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// State over an empty in-memory store with fixed test secrets.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            store_backend: StoreBackend::Memory,
            database_url: None,
            max_connections: 1,
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            words_per_minute: crate::blog::content::DEFAULT_WORDS_PER_MINUTE,
        });

        Self::from_parts(Arc::new(MemoryStore::new()), config)
    }
}
