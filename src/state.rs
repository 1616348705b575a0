use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::AppConfig,
    db::build_pool,
    error::{AppError, AppResult},
    repository::kpi_store::{KpiStore, PgKpiStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: Option<PgPool>,
    pub kpi_store: Option<Arc<dyn KpiStore>>,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, sqlx::Error> {
        let db_pool = build_pool(&config)?;
        if db_pool.is_none() {
            tracing::warn!("DATABASE_URL is not set; KPI reports will answer 502");
        }
        let kpi_store = db_pool
            .clone()
            .map(|pool| Arc::new(PgKpiStore::new(pool)) as Arc<dyn KpiStore>);

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            kpi_store,
        })
    }

    pub fn kpi_store(&self) -> AppResult<&dyn KpiStore> {
        self.kpi_store.as_deref().ok_or_else(|| {
            AppError::Dependency("KPI database is not configured. Set DATABASE_URL.".to_string())
        })
    }
}

#[cfg(test)]
impl AppState {
    pub fn with_store(config: AppConfig, store: Option<Arc<dyn KpiStore>>) -> Self {
        Self {
            config: Arc::new(config),
            db_pool: None,
            kpi_store: store,
        }
    }
}
