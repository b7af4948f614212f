//! # doppel - a test-double engine
//!
//! Doubles that transparently record every invocation directed at them —
//! including invocations of members that do not exist — plus a registry for
//! substituting dependencies by name and a sandbox for evaluating script
//! source with injected globals and a custom dependency resolver.
//!
//! ## Quick Start
//!
//! ### Recording calls on a double
//!
//! ```
//! use doppel::double::{CallRecorder, Value};
//!
//! let recorder = CallRecorder::new();
//! let double = recorder.as_double();
//!
//! // The member does not exist; the call is recorded and the result is a
//! // further chainable double.
//! double
//!     .invoke("thisFunctionDoesNotExist", vec![Value::int(1), Value::int(2)])
//!     .unwrap();
//!
//! assert!(recorder.was_called_with_arguments(
//!     "thisFunctionDoesNotExist",
//!     &[Value::int(1), Value::int(2)],
//! ));
//! ```
//!
//! ### Mocking a module
//!
//! ```
//! use doppel::double::{CallRecorder, MemberSpec, MockRegistry, Value};
//!
//! let mut registry = MockRegistry::new();
//! let http = registry.cached_recorder("http");
//! registry.mock_module(&http, "http", vec![MemberSpec::Name("write".to_string())]);
//!
//! // Code under test resolves its dependency through the registry seam.
//! let surface = registry.resolve("http", |_| Ok(Value::Undefined)).unwrap();
//! if let Value::Double(module) = surface {
//!     module.invoke("write", vec![Value::str("ok")]).unwrap();
//! }
//!
//! assert!(http.was_called_with_arguments("write", &[Value::str("ok")]));
//! ```
//!
//! ### Evaluating script source against injected globals
//!
//! ```
//! use doppel::double::Value;
//! use doppel::sandbox::{execute_statements, parse_script, Scope};
//!
//! let scope = Scope::root();
//! scope.declare("testGlobal", Value::int(7));
//!
//! let ast = parse_script("var out = testGlobal + 1;").unwrap();
//! execute_statements(&ast, &scope).unwrap();
//!
//! assert_eq!(scope.lookup("out"), Some(Value::int(8)));
//! ```
//!
//! File-based loading with dependency interception goes through
//! [`sandbox::Sandbox`], whose synthesized `require` consults a
//! [`double::MockRegistry`] before touching the filesystem.
//!
//! ## Architecture
//!
//! - **[`double`]** - the interception/recording engine: dynamic values,
//!   deep-equality matching, the call log, doubles, the module-mock
//!   registry and the subclass factory
//! - **[`sandbox`]** - PEG parser, tree-walking evaluator and the sandboxed
//!   loader
//! - **[`error`]** - the crate-wide error type

#[macro_use]
extern crate lazy_static;

pub mod double;
pub mod error;
pub mod sandbox;

pub use error::EngineError;
