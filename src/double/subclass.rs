//! Constructible types whose instances share a recorder's log by reference.
//!
//! Models APIs where a mocked factory method must itself return a
//! further-mockable type: a schema-to-model constructor, for example. Later
//! method calls on any instance remain visible on the original recorder.

use std::rc::Rc;

use tracing::trace;

use crate::double::recorder::{CallRecorder, CLASS_CALL};
use crate::double::value::{rc_identity, Value};
use crate::double::wrap::Double;
use crate::error::EngineError;

/// Client constructor body, run bound to the freshly built instance with the
/// construction arguments.
pub type ConstructorFn = Rc<dyn Fn(&Double, &[Value]) -> Result<(), EngineError>>;

/// A constructible type produced by [`CallRecorder::create_class`].
///
/// Instantiation performs base initialization, runs the client constructor
/// bound to the new instance, then records a call under the reserved member
/// name [`CLASS_CALL`] with exactly the construction arguments.
pub struct ClassType {
    recorder: CallRecorder,
    ctor: ConstructorFn,
}

impl Clone for ClassType {
    fn clone(&self) -> Self {
        ClassType {
            recorder: self.recorder.clone(),
            ctor: self.ctor.clone(),
        }
    }
}

impl std::fmt::Debug for ClassType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClassType({})", self.recorder.id())
    }
}

impl ClassType {
    /// Build an instance. The instance is a double whose log store is the
    /// originating recorder's, shared by reference, so undefined-member
    /// calls on it land in the same log as calls on the recorder itself.
    pub fn instantiate(&self, args: Vec<Value>) -> Result<Double, EngineError> {
        trace!(recorder = %self.recorder.id(), argc = args.len(), "class instantiated");
        let instance = Double::wrap(&self.recorder.subclass_instance());
        (self.ctor)(&instance, &args)?;
        self.recorder.log_call(CLASS_CALL, args);
        Ok(instance)
    }

    /// Identity comparison: two values hold the same class.
    pub fn ptr_eq(&self, other: &ClassType) -> bool {
        rc_identity(&self.ctor, &other.ctor)
    }
}

impl CallRecorder {
    /// Create a constructible type bound to this recorder. See [`ClassType`].
    pub fn create_class(&self, ctor: ConstructorFn) -> ClassType {
        ClassType {
            recorder: self.clone(),
            ctor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::double::value::Value;

    #[test]
    fn each_instantiation_records_a_class_entry() {
        let recorder = CallRecorder::new();
        let class = recorder.create_class(Rc::new(|_, _| Ok(())));
        class.instantiate(vec![Value::str("a")]).unwrap();
        class.instantiate(vec![Value::str("b")]).unwrap();
        assert_eq!(
            recorder.all_call_arguments(CLASS_CALL),
            Some(vec![vec![Value::str("a")], vec![Value::str("b")]])
        );
    }

    #[test]
    fn constructor_runs_bound_to_the_new_instance() {
        let recorder = CallRecorder::new();
        let class = recorder.create_class(Rc::new(|instance, args| {
            instance.set("first", args.first().cloned().unwrap_or(Value::Undefined));
            Ok(())
        }));
        let instance = class.instantiate(vec![Value::int(9)]).unwrap();
        assert_eq!(instance.get("first"), Value::int(9));
    }

    #[test]
    fn instances_share_the_log_store_by_reference() {
        let recorder = CallRecorder::new();
        let class = recorder.create_class(Rc::new(|_, _| Ok(())));
        let instance = class.instantiate(vec![]).unwrap();
        assert!(recorder.shares_log_with(instance.recorder()));
        instance.invoke("save", vec![Value::int(1)]).unwrap();
        assert!(recorder.was_called_with_arguments("save", &[Value::int(1)]));
    }

    #[test]
    fn reset_on_the_root_is_seen_by_instances() {
        let recorder = CallRecorder::new();
        let class = recorder.create_class(Rc::new(|_, _| Ok(())));
        let instance = class.instantiate(vec![]).unwrap();
        instance.invoke("touch", vec![]).unwrap();
        recorder.reset();
        assert_eq!(instance.recorder().call_count("touch"), 0);
    }
}
