//! The interception/recording engine.
//!
//! - [`value`] - the dynamic value type flowing through doubles
//! - [`matcher`] - structural deep equality over argument lists
//! - [`recorder`] - the per-double append-only call log
//! - [`wrap`] - the double itself: `invoke`/`get`/`set`/`construct`
//! - [`registry`] - name-to-surface substitution for dependencies
//! - [`subclass`] - constructible types sharing a recorder's log

pub mod matcher;
pub mod recorder;
pub mod registry;
pub mod subclass;
pub mod value;
pub mod wrap;

pub use matcher::{deep_equal, DeepEqualFn};
pub use recorder::{CallRecorder, CLASS_CALL};
pub use registry::{MemberSpec, MockRegistry};
pub use subclass::{ClassType, ConstructorFn};
pub use value::{CallbackFn, NumberType, Value};
pub use wrap::Double;
