// src/normalization/mod.rs
pub mod country;
pub mod dates;
pub mod decompose;
pub mod entity_type;
pub mod flight_confidence;
pub mod phone;
