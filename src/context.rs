/// Application context and dependency wiring
use crate::{
    catalog::CatalogManager,
    config::ServerConfig,
    db,
    error::{ApiError, ApiResult},
    review::ReviewClassifier,
    tokens::TokenService,
    users::UserManager,
};
use std::sync::Arc;
use std::time::Duration;

/// Application context holding all shared services, constructed once at
/// startup and cloned into every handler
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub tokens: Arc<TokenService>,
    pub users: Arc<UserManager>,
    pub catalog: Arc<CatalogManager>,
    pub review: Arc<ReviewClassifier>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        // Fail fast on bad configuration before accepting any request
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let pool = db::create_pool(&config.storage.catalog_db, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let query_timeout = Duration::from_secs(config.storage.query_timeout_secs);

        let tokens = Arc::new(TokenService::new(
            pool.clone(),
            config.auth.clone(),
            query_timeout,
        ));
        let users = Arc::new(UserManager::new(
            pool.clone(),
            Arc::clone(&tokens),
            query_timeout,
        ));
        let catalog = Arc::new(CatalogManager::new(
            pool.clone(),
            query_timeout,
            config.catalog.recommendation_limit,
        ));
        let review = Arc::new(ReviewClassifier::new(
            pool.clone(),
            config.classifier.clone(),
            query_timeout,
        )?);

        Ok(Self {
            config: Arc::new(config),
            tokens,
            users,
            catalog,
            review,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ApiResult<()> {
        let dir = &config.storage.data_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                ApiError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        Ok(())
    }
}
