//! Redis cache backend
//!
//! Suggestion entries are plain strings under `{prefix}{key}`, written with
//! `SET EX` so Redis owns expiry.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::{CacheBackend, CacheError};

/// Shared cache in Redis
#[derive(Clone)]
pub struct RedisCacheBackend {
    connection: ConnectionManager,
    /// Key prefix for namespacing (e.g., "dossier:" → "dossier:suggest:...")
    prefix: String,
}

impl RedisCacheBackend {
    /// Connect with an optional key prefix
    pub async fn connect(url: &str, prefix: Option<&str>) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(|e| CacheError::Backend(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        tracing::info!(url = %redact(url), "Connected to Redis suggestion cache");
        Ok(Self::from_connection(connection, prefix))
    }

    /// Wrap an existing connection manager
    pub fn from_connection(connection: ConnectionManager, prefix: Option<&str>) -> Self {
        Self {
            connection,
            prefix: prefix.unwrap_or("").to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[inline]
    fn prefixed_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}{}", self.prefix, key)
        }
    }
}

fn map_redis_error(e: redis::RedisError) -> CacheError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() {
        CacheError::Unavailable(e.to_string())
    } else {
        CacheError::Backend(e.to_string())
    }
}

/// Strip credentials from a connection URL for logging
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.clone();
        conn.get(self.prefixed_key(key))
            .await
            .map_err(map_redis_error)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(self.prefixed_key(key), value, ttl.as_secs().max(1))
            .await
            .map_err(map_redis_error)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
