//! Command handlers.

pub mod check;
pub mod eval;
pub mod list;
