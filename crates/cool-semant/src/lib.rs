//! Semantic analysis for Cool programs.
//!
//! The analyzer takes the class declarations produced by the parser, builds
//! and validates the inheritance graph, and decorates every expression with
//! its static type.

pub mod ast;
pub mod semantic;

pub use semantic::{analyze, Analysis, Halt, HaltStage};
