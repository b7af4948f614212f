//! Sandboxed evaluation of script source with injected globals and a custom
//! dependency resolver.
//!
//! - [`parser`] - PEG parser for the script subset
//! - [`ast`] - AST node types
//! - [`eval`] - tree-walking evaluator
//! - [`loader`] - the sandbox itself

pub mod ast;
pub mod eval;
pub mod loader;
pub mod parser;

pub use eval::{evaluate_expression, execute_statements, Completion, Scope};
pub use loader::Sandbox;
pub use parser::parse_script;
