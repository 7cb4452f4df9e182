pub mod cache_store;
pub mod coordinator;
pub mod upstream;
