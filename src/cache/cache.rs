use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, CacheError},
    schema::{Ingredient, Tag},
    INGREDIENT_CACHE_KEY, REFERENCE_CACHE_TTL_SECONDS, TAG_CACHE_KEY,
};

// Caching - keys

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKeyType {
    Ingredients,
    Tags,
}

impl CacheKeyType {
    pub fn key(&self) -> &'static str {
        match self {
            CacheKeyType::Ingredients => INGREDIENT_CACHE_KEY,
            CacheKeyType::Tags => TAG_CACHE_KEY,
        }
    }
}

// Caching - values

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug)]
pub struct IngredientList {
    pub ingredients: Vec<Ingredient>,
}

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug)]
pub struct TagList {
    pub tags: Vec<Tag>,
}

/// Read-through cache for reference data. Without a connection every lookup
/// goes straight to the fetch callback; Redis failures are logged and treated
/// as misses.
#[derive(Clone)]
pub struct ReferenceCache {
    connection: Option<MultiplexedConnection>,
    ttl_seconds: u64,
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::disabled()
    }
}

impl ReferenceCache {
    pub fn disabled() -> Self {
        Self {
            connection: None,
            ttl_seconds: REFERENCE_CACHE_TTL_SECONDS,
        }
    }

    pub fn new(connection: MultiplexedConnection, ttl_seconds: u64) -> Self {
        Self {
            connection: Some(connection),
            ttl_seconds,
        }
    }

    pub async fn connect(redis_url: Option<&str>) -> Self {
        let Some(redis_url) = redis_url else {
            log::info!("REDIS_URL not set, reference cache disabled");
            return Self::disabled();
        };

        let connection = match redis::Client::open(redis_url) {
            Ok(client) => client.get_multiplexed_async_connection().await,
            Err(e) => Err(e),
        };

        match connection {
            Ok(connection) => {
                log::info!("Connected to Redis reference cache");
                Self::new(connection, REFERENCE_CACHE_TTL_SECONDS)
            }
            Err(e) => {
                log::error!("Failed to connect to Redis, reference cache disabled: {}", CacheError::from(e));
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.connection.is_some()
    }

    pub async fn get_or_fetch<V, F, Fut>(&self, key: CacheKeyType, fetch: F) -> Result<V, ApiError>
    where
        V: FromRedisValue + ToRedisArgs + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>>,
    {
        let Some(connection) = &self.connection else {
            return fetch().await;
        };
        let mut connection = connection.clone();

        match get_cache_value::<&str, V>(key.key(), &mut connection).await {
            Ok(Some(value)) => {
                log::trace!("> Found {}", key.key());
                return Ok(value);
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("> Failed to read cached value. Deleting {} {e}", key.key());
                if let Err(e) = delete_cache_value(key.key(), &mut connection).await {
                    log::error!("> Failed to delete cached value! {e}");
                }
            }
        }

        log::trace!("> Fetching {}", key.key());
        let value = fetch().await?;

        if let Err(e) = set_cache_value(key.key(), &value, self.ttl_seconds, &mut connection).await {
            log::error!("> Failed to cache {}: {e}", key.key());
        }

        Ok(value)
    }

    pub async fn invalidate(&self, key: CacheKeyType) {
        let Some(connection) = &self.connection else {
            return;
        };
        let mut connection = connection.clone();

        log::trace!("> Invalidated {}", key.key());
        if let Err(e) = delete_cache_value(key.key(), &mut connection).await {
            log::error!("> Failed to invalidate {}: {e}", key.key());
        }
    }
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    ttl_seconds: u64,
    cache: &mut MultiplexedConnection,
) -> Result<(), CacheError> {
    let _: () = cache.set_ex(key, value, ttl_seconds).await?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), CacheError> {
    let _: () = cache.del(key).await?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, CacheError> {
    let value: Option<V> = cache.get(key).await?;

    Ok(value)
}
