pub mod collections;
pub mod identities;
pub mod redis;
pub mod store;
pub mod versioned;

pub use collections::{CollectionRepository, CollectionUpdate};
pub use identities::IdentityRepository;
pub use redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle, RedisStore};
pub use store::{KeyValueStore, MemoryStore};
