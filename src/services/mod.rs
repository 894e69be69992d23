// src/services/mod.rs
pub mod pipeline;
pub mod store;
pub mod summary;
