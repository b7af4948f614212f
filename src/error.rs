//! Crate-wide error type.
//!
//! Every fallible operation in the engine returns [`EngineError`]. Argument
//! mismatches raised by a deep-equality comparison use the `Mismatch` variant
//! and are caught inside the recorder's query operations, never propagated.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A value was used in a way its type does not support, e.g. invoking a
    /// plain attribute as a function.
    #[error("type error: {0}")]
    Type(String),

    /// An identifier could not be resolved in any reachable scope.
    #[error("reference error: {0}")]
    Reference(String),

    /// Script source failed to parse.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Two argument lists were not structurally equal.
    #[error("argument mismatch: {0}")]
    Mismatch(String),

    /// Reading script source from disk failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
