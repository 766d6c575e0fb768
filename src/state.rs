use crate::auth::password::Hasher;
use crate::auth::repo::{InMemoryUserStore, PgUserStore, UserStore};
use crate::auth::services::CredentialService;
use crate::config::{AppConfig, StoreBackend};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: CredentialService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn UserStore> = match config.store {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;
                Arc::new(PgUserStore::connect(url, config.max_connections).await?)
            }
            StoreBackend::Memory => {
                warn!("using in-memory user store; records are lost on restart");
                Arc::new(InMemoryUserStore::new())
            }
        };
        info!(backend = ?config.store, "user store initialised");

        Self::from_parts(config, store)
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let hasher = Hasher::new(&config.hash)?;
        Ok(Self {
            auth: CredentialService::new(store, hasher),
            config,
        })
    }

    /// In-memory state with cheap hashing, for tests.
    #[cfg(test)]
    pub fn fake_with_store(store: Arc<dyn UserStore>) -> Self {
        use crate::config::HashConfig;

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            store: StoreBackend::Memory,
            database_url: None,
            max_connections: 1,
            hash: HashConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
        });
        Self::from_parts(config, store).expect("test hash params are valid")
    }
}
