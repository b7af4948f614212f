//! The dynamic double: an explicit capability-set interface over a recorder.
//!
//! Arbitrary member access is routed through `invoke`/`get`/`set`/`construct`
//! rather than runtime reflection. Existing members forward transparently;
//! absent members route to the recorder's catch-all handler, which records
//! the call and returns a further chainable double.

use crate::double::recorder::{CallRecorder, Member};
use crate::double::value::Value;
use crate::error::EngineError;

/// A wrapper identity around a recorder. Does not own a separate log: the
/// double and its recorder share the log store.
pub struct Double {
    recorder: CallRecorder,
}

impl Clone for Double {
    fn clone(&self) -> Self {
        Double {
            recorder: self.recorder.clone(),
        }
    }
}

impl std::fmt::Debug for Double {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Double({})", self.recorder.id())
    }
}

impl Double {
    /// Wrap a recorder so every member access on the result is intercepted.
    pub fn wrap(recorder: &CallRecorder) -> Double {
        Double {
            recorder: recorder.clone(),
        }
    }

    /// The recorder backing this double.
    pub fn recorder(&self) -> &CallRecorder {
        &self.recorder
    }

    /// Two doubles wrap the same recorder.
    pub fn ptr_eq(&self, other: &Double) -> bool {
        self.recorder.ptr_eq(&other.recorder)
    }

    /// Invoke member `name` with `args`.
    ///
    /// - a spy records the call, then runs its callback;
    /// - a callable attribute forwards transparently and is *not* recorded;
    /// - a class attribute is treated as a constructible function;
    /// - a non-callable attribute is a type error, the ordinary host error;
    /// - an absent member routes to the catch-all: the call is recorded and
    ///   a chainable double over the same recorder is returned.
    pub fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value, EngineError> {
        match self.recorder.member(name) {
            Some(Member::Spy(callback)) => self.recorder.run_spy(name, &callback, args),
            Some(Member::Attribute(Value::Callback(f))) => f(args),
            Some(Member::Attribute(Value::Class(class))) => {
                Ok(Value::Double(class.instantiate(args)?))
            }
            Some(Member::Attribute(value)) => Err(EngineError::Type(format!(
                "member '{}' is a {} and cannot be invoked",
                name,
                value.type_name()
            ))),
            None => Ok(self.recorder.record_undefined(name, args)),
        }
    }

    /// Read member `name`. Spies read as standalone recording callbacks;
    /// attributes read as their value; absent members read as `Undefined`.
    pub fn get(&self, name: &str) -> Value {
        match self.recorder.member(name) {
            Some(Member::Spy(callback)) => {
                Value::Callback(self.recorder.spy_handle(name, callback))
            }
            Some(Member::Attribute(value)) => value,
            None => Value::Undefined,
        }
    }

    /// Install or overwrite a plain attribute on the underlying recorder.
    pub fn set(&self, name: &str, value: Value) {
        self.recorder.set_attribute(name, value);
    }

    /// Construct from member `name`, which must be flagged constructor-like
    /// (see [`CallRecorder::register_constructor`]) and hold a class. The
    /// new instance is itself a transparently intercepted double.
    pub fn construct(&self, name: &str, args: Vec<Value>) -> Result<Double, EngineError> {
        if !self.recorder.is_constructor(name) {
            return Err(EngineError::Type(format!(
                "member '{}' is not registered as a constructor",
                name
            )));
        }
        match self.recorder.member(name) {
            Some(Member::Attribute(Value::Class(class))) => class.instantiate(args),
            _ => Err(EngineError::Type(format!(
                "constructor member '{}' does not hold a class",
                name
            ))),
        }
    }
}
