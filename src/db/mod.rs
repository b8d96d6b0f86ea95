// src/db/mod.rs
pub mod readers;
pub mod schema;
pub mod writer;
