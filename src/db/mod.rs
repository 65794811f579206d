pub mod catalog;
pub mod genres;
pub mod memory;
pub mod postgres;
pub mod redis;
pub mod users;

pub use catalog::{CatalogStore, PgCatalogStore, SyncPlan};
pub use genres::{GenreLookup, PgGenreStore};
pub use memory::{MemoryCatalogStore, MemoryGenreStore, MemoryUserStore};
pub use postgres::{create_pool, run_migrations};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use users::{PgUserStore, UserStore};
