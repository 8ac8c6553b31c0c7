//! Redis操作模組
//!
//! 快取外觀 [`CacheManager`] 的實現，按用途拆分為鍵值、雜湊與鍵空間三組操作。
//! 每個操作借用一條連接、執行一次遠端調用，連接在任何路徑上都會歸還。

pub mod cache;
pub mod hash;
pub mod keyspace;
pub mod manager;

pub use cache::CacheOperations;
pub use hash::HashOperations;
pub use keyspace::KeyspaceOperations;
pub use manager::{CacheError, CacheManager};
