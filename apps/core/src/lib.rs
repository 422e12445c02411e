pub mod assembler;
pub mod cache_key;
pub mod config;
pub mod contract;
pub mod core_service;
pub mod icon_store;
pub mod keyed_lock;
pub mod logging;
pub mod model;
pub mod opener;
pub mod query;
pub mod runtime;
pub mod settings;
pub mod shard_store;
pub mod term_cache;
pub mod transport;
