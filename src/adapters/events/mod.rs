//! Event publishing adapters.
//!
//! - `InMemoryEventBus` - in-process capture for tests
//! - `RedisEventPublisher` - Redis pub/sub for deployments

mod in_memory;
mod redis_publisher;

pub use in_memory::InMemoryEventBus;
pub use redis_publisher::RedisEventPublisher;
