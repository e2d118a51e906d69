use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{ApiError, CacheError};

const CATALOG_CACHE_KEY: &str = "catalog-cache-key";

// Caching - keys

#[derive(Serialize, Clone, Debug)]
pub struct CacheKey<T: ToString + Serialize> {
    _value: T,
    _type: CacheKeyType,
}

impl<T: ToString + Serialize> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self {
            _value: key,
            _type: r#type,
        }
    }
}

impl<T: ToString + Serialize> std::fmt::Display for CacheKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self._type {
            CacheKeyType::Tags => write!(f, "tags-{}", self._value.to_string()),
            CacheKeyType::Ingredients => write!(f, "ingredients-{}", self._value.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheKeyType {
    Tags,
    Ingredients,
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

impl<T: ToString + Serialize> From<&CacheKey<T>> for CacheLifetime {
    fn from(key: &CacheKey<T>) -> Self {
        match &key._type {
            CacheKeyType::Tags | CacheKeyType::Ingredients => CacheLifetime::BindCatalogCache,
        }
    }
}

// Cache - wrappers

/// What a cached value stays valid against.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum CacheLifetime {
    /// Valid until the next catalog write.
    BindCatalogCache,
}

impl CacheLifetime {
    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, ApiError> {
        match self {
            CacheLifetime::BindCatalogCache => {
                get_cache_value::<&str, String>(CATALOG_CACHE_KEY, cache).await
            }
        }
    }
}

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct RedisValue<T: Serialize + Send + Sync + Clone> {
    pub value: T,
    _lifetime: CacheLifetime,
    _bind: Option<String>,
}

impl<T: Serialize + DeserializeOwned + Send + Sync + Clone> RedisValue<T> {
    /// `bind` must be read before `value` is fetched, so a write that lands in
    /// between leaves the entry already stale.
    fn bound(value: T, lifetime: CacheLifetime, bind: Option<String>) -> Self {
        Self {
            value,
            _lifetime: lifetime,
            _bind: bind,
        }
    }

    fn is_bound_to(&self, current: &Option<String>) -> bool {
        &self._bind == current
    }

    async fn validate(&self, cache: &mut MultiplexedConnection) -> Result<bool, ApiError> {
        let current = self._lifetime.get_cache_bind(cache).await?;
        Ok(self.is_bound_to(&current))
    }

    /// Cached list under `key`, or the callback's list which is then cached.
    /// Cache failures are logged and fall through to the callback.
    pub async fn get_or_list<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<Vec<T>, ApiError>
    where
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<T>, ApiError>> + Send,
    {
        let value = get_cache_value::<String, RedisValue<Vec<T>>>(key.to_string(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                None
            });
        // * Cannot use .map(|| {...}) due to async closures
        let value = match value {
            Some(value) => {
                log::trace!("> Found {:?}", key.to_string());
                match value.validate(cache).await {
                    Ok(true) => Some(value),
                    Ok(false) => {
                        log::trace!("> Invalidated {:?}", key.to_string());
                        None
                    }
                    Err(e) => {
                        log::error!("> Failed to validate {}: {e}", key.to_string());
                        None
                    }
                }
            }
            None => None,
        };

        if let Some(value) = value {
            return Ok(value.value);
        }

        let lifetime = CacheLifetime::from(&key);
        let bind = lifetime.get_cache_bind(cache).await;

        log::trace!("> Fetching {:?}", key.to_string());
        let list = callback().await?;

        match bind {
            Ok(bind) => {
                let value = RedisValue::bound(list.clone(), lifetime, bind);
                if let Err(e) =
                    set_cache_value::<String, RedisValue<Vec<T>>>(key.to_string(), value, cache)
                        .await
                {
                    log::error!("{e:?}");
                }
            }
            Err(e) => log::error!("> Failed to bind {}: {e}", key.to_string()),
        }

        Ok(list)
    }
}

/// Serves a catalog list through the cache when one is configured.
pub async fn cached_list<T, K, F, Fut>(
    cache: Option<MultiplexedConnection>,
    key: CacheKey<K>,
    callback: F,
) -> Result<Vec<T>, ApiError>
where
    T: Serialize + DeserializeOwned + Send + Sync + Clone,
    K: ToString + Serialize + Clone + Send + Sync,
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<Vec<T>, ApiError>> + Send,
{
    match cache {
        Some(mut cache) => RedisValue::<T>::get_or_list(key, &mut cache, callback).await,
        None => callback().await,
    }
}

/// Rotates the catalog bind, which invalidates every cached tag and ingredient list.
pub async fn invalidate_catalog(cache: Option<MultiplexedConnection>) {
    let Some(mut cache) = cache else {
        return;
    };

    let bind = uuid::Uuid::new_v4().to_string();
    match set_cache_value(CATALOG_CACHE_KEY, bind, &mut cache).await {
        Ok(()) => log::debug!("Invalidated catalog cache"),
        Err(e) => log::error!("Failed to invalidate catalog cache: {e}"),
    }
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), ApiError> {
    let _: () = cache
        .set(key, value)
        .await
        .map_err(|e| ApiError::from(CacheError::from(e)))?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), ApiError> {
    let _: () = cache
        .del(key)
        .await
        .map_err(|e| ApiError::from(CacheError::from(e)))?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, ApiError> {
    let value: Option<V> = cache
        .get(key)
        .await
        .map_err(|e| ApiError::from(CacheError::from(e)))?;

    Ok(value)
}
