use thiserror::Error;

use crate::span::Position;

/// A single compile error at a source position.
///
/// Everything the code generator reports is an internal compiler error:
/// each condition it checks should have been rejected by the preceding
/// type-checking and binding pass, so a hit signals a defect upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{pos}: {message}")]
pub struct CompileError {
    pub pos: Position,
    pub message: String,
}

/// Ordered collection of compile errors.
///
/// The backend accumulates errors instead of aborting on the first one,
/// so that independent defects are collected in a single pass.
/// Compilation fails iff this list is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList {
    errors: Vec<CompileError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pos: Position, message: impl Into<String>) {
        self.errors.push(CompileError {
            pos,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<CompileError> {
        self.errors
    }
}

impl std::fmt::Display for ErrorList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}
