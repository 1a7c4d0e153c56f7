//!
//! This crate contains the definitions shared between the Mate interpreter and the tools that feed it code.
//!

/// The Abstract Syntax Tree definitions, as produced by a front end.
pub mod ast;
/// Helpers for assembling syntax trees programmatically.
pub mod build;
