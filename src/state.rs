use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::store::{MemoryStore, PgStore, UserStore};
use crate::users::Directory;

#[derive(Clone)]
pub struct AppState {
    pub directory: Directory,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let store = PgStore::connect(url).await?;
                info!("connected to postgres store");
                Arc::new(store)
            }
            None => {
                warn!("DATABASE_URL not set; falling back to the in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        let directory = Directory::new(store, config.report.created_by);
        Ok(Self { directory })
    }

    /// State over a fresh in-memory store, for tests.
    pub fn in_memory() -> Self {
        Self {
            directory: Directory::new(Arc::new(MemoryStore::new()), "Test Issuer".into()),
        }
    }
}
