pub mod redis;
pub mod store;

mod macros;

pub use self::redis::{create_redis_client, RedisStore};
pub use store::{KeyValueStore, MemoryStore, StoreKey};
