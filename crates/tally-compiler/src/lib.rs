//! Bytecode backend for the log-metrics language: a single-pass
//! translation of the type-annotated syntax tree into an instruction
//! sequence and its constant pools.

pub mod ast;
pub mod codegen;
pub mod types;

pub use codegen::compile;
