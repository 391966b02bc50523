use std::sync::Mutex;
use std::time::Duration;

use redis::{Client, Commands, Connection, RedisError, RedisResult};
use tokio::runtime::{Handle, RuntimeFlavor};

use super::{KeyValueStore, StoreKey};
use crate::error::{AppError, AppResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Creates a Redis client for key-value persistence
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis-backed store
///
/// Holds one synchronous connection, opened lazily and reopened on the next
/// call after a connection-level failure. Connects, reads and writes are
/// bounded by timeouts.
pub struct RedisStore {
    redis_client: Client,
    connection: Mutex<Option<Connection>>,
}

impl RedisStore {
    pub fn new(redis_client: Client) -> Self {
        Self {
            redis_client,
            connection: Mutex::new(None),
        }
    }

    fn connect(&self) -> RedisResult<Connection> {
        let conn = self.redis_client.get_connection_with_timeout(CONNECT_TIMEOUT)?;
        conn.set_read_timeout(Some(IO_TIMEOUT))?;
        conn.set_write_timeout(Some(IO_TIMEOUT))?;
        tracing::debug!("Opened Redis connection");
        Ok(conn)
    }

    /// Runs `op` on the shared connection
    fn with_connection<T>(&self, op: impl FnOnce(&mut Connection) -> RedisResult<T>) -> AppResult<T> {
        offload(|| {
            let mut slot = self
                .connection
                .lock()
                .map_err(|_| AppError::Internal("redis connection lock poisoned".to_string()))?;

            let mut conn = match slot.take() {
                Some(conn) => conn,
                None => self.connect()?,
            };

            match op(&mut conn) {
                Ok(value) => {
                    *slot = Some(conn);
                    Ok(value)
                }
                Err(e) => {
                    if is_connection_failure(&e) {
                        tracing::warn!(error = %e, "Dropping Redis connection");
                    } else {
                        *slot = Some(conn);
                    }
                    Err(e.into())
                }
            }
        })
    }
}

fn is_connection_failure(e: &RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
}

/// Lets the runtime move other tasks off this worker while `f` blocks
///
/// `block_in_place` is only available on the multi-threaded runtime; elsewhere
/// `f` runs inline.
fn offload<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

impl KeyValueStore for RedisStore {
    fn get(&self, key: &StoreKey) -> AppResult<Option<String>> {
        self.with_connection(|conn| conn.get(key.to_string()))
    }

    fn set(&self, key: &StoreKey, value: &str) -> AppResult<()> {
        self.with_connection(|conn| conn.set::<_, _, ()>(key.to_string(), value))?;
        tracing::debug!(key = %key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &StoreKey) -> AppResult<()> {
        self.with_connection(|conn| conn.del::<_, ()>(key.to_string()))
    }
}
