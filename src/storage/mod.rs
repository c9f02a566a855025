mod repository;

pub use repository::*;

/// SQL migration for the key/value store
pub const MIGRATION_001_KV_STORE: &str = include_str!("migrations/001_kv_store.sql");
