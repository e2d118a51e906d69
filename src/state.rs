use std::sync::Arc;

use redis::aio::MultiplexedConnection;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use warp::Filter;

use crate::{config::Config, error::ApiError};

/// Everything a handler needs, cloned into each request.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub cache: Option<MultiplexedConnection>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn connect(config: Config) -> Result<Self, ApiError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to apply migrations: {e}")))?;

        let cache = match &config.redis_url {
            Some(url) => Some(connect_cache(url).await?),
            None => {
                log::info!("REDIS_URL not set, catalog caching disabled");
                None
            }
        };

        Ok(Self {
            pool,
            cache,
            config: Arc::new(config),
        })
    }

    /// State over an already migrated pool, without a cache.
    pub fn from_pool(pool: Pool<Postgres>, config: Config) -> Self {
        Self {
            pool,
            cache: None,
            config: Arc::new(config),
        }
    }

    /// State over a pool that connects on first use. Nothing is migrated.
    pub fn lazy(config: Config) -> Result<Self, ApiError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect_lazy(&config.database_url)?;

        Ok(Self {
            pool,
            cache: None,
            config: Arc::new(config),
        })
    }
}

async fn connect_cache(url: &str) -> Result<MultiplexedConnection, ApiError> {
    let client = redis::Client::open(url)
        .map_err(|e| ApiError::Internal(format!("Invalid REDIS_URL: {e}")))?;

    client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to connect to redis: {e}")))
}

pub fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || state.clone())
}
