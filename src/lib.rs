// src/lib.rs
pub mod db;
pub mod identity;
pub mod models;
pub mod normalization;
pub mod pipelines;
pub mod utils;
pub mod verify;

pub use models::normalized::{EntityType, IdentityConfidence, ParseType, PhoneType, SourceTable};
pub use utils::config::PipelineConfig;
