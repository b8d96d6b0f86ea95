// src/identity/mod.rs
pub mod blocking;
pub mod keys;
pub mod name_parser;
pub mod tagger;
