//! Quantity document persistence.
//!
//! Quantities are stored as flat name-to-formula documents in YAML or
//! TOML. Loading is a sparse merge: keys absent from the incoming
//! document leave existing entries unchanged.

pub mod document;

pub use document::{ConfigError, Entry, QuantityDoc, Result};
