// src/models/mod.rs
pub mod normalized;
pub mod raw;
pub mod stats_models;
