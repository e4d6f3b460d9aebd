//! Core data model for the lastform recompute engine.
//!
//! A [`quantity::Quantity`] is a named scalar backed by a formula that may
//! reference other quantities by name. Formulas are compiled through the
//! [`formula::FormulaCompiler`] seam; the [`expr`] module provides a small
//! arithmetic compiler for embedders that do not bring their own.

pub mod expr;
pub mod formula;
pub mod group;
pub mod quantity;
