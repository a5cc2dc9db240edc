//! Conversation threads and their persistence

pub mod context;
pub mod store;

pub use context::ThreadContext;
pub use store::{MemoryThreadStore, RedisThreadStore, ThreadStore};
