//! Per-double append-only log of invocations, keyed by member name.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use tracing::trace;
use uuid::Uuid;

use crate::double::matcher::{default_deep_equal, DeepEqualFn};
use crate::double::value::{CallbackFn, Value};
use crate::double::wrap::Double;

/// Reserved member name under which every class instantiation is recorded.
pub const CLASS_CALL: &str = "Class";

/// Shared call log: member name to ordered argument lists.
///
/// Kept behind its own handle so subclass instances created through
/// [`create_class`](crate::double::CallRecorder::create_class) observe the
/// originating recorder's log by reference, never a copy.
pub(crate) type CallLog = Rc<RefCell<HashMap<String, Vec<Vec<Value>>>>>;

/// A member installed on a recorder and visible through its doubles.
#[derive(Clone)]
pub(crate) enum Member {
    /// Installed by `spy`: records its arguments, then runs the callback.
    Spy(Option<CallbackFn>),
    /// A plain attribute. Callable attributes forward without recording.
    Attribute(Value),
}

pub(crate) struct RecorderState {
    id: Uuid,
    log: CallLog,
    constructors: HashSet<String>,
    members: HashMap<String, Member>,
    deep_equal: DeepEqualFn,
}

/// Records every invocation directed at a double, including invocations of
/// members that do not exist, and exposes query operations over the log.
///
/// A `CallRecorder` is a cheap handle: cloning yields another identity of the
/// same recorder. Created per test scenario and dropped with it.
pub struct CallRecorder {
    state: Rc<RefCell<RecorderState>>,
}

impl Clone for CallRecorder {
    fn clone(&self) -> Self {
        CallRecorder {
            state: self.state.clone(),
        }
    }
}

impl fmt::Debug for CallRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallRecorder({})", self.id())
    }
}

impl Default for CallRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl CallRecorder {
    /// Create a recorder with the default structural deep-equality
    /// comparison.
    pub fn new() -> Self {
        Self::with_deep_equal(default_deep_equal())
    }

    /// Create a recorder with a custom argument-list comparison. A
    /// comparison error is always reduced to "no match" by the queries.
    pub fn with_deep_equal(deep_equal: DeepEqualFn) -> Self {
        CallRecorder {
            state: Rc::new(RefCell::new(RecorderState {
                id: Uuid::new_v4(),
                log: Rc::new(RefCell::new(HashMap::new())),
                constructors: HashSet::new(),
                members: HashMap::new(),
                deep_equal,
            })),
        }
    }

    /// Build a fresh recorder whose log store is this recorder's, shared by
    /// reference. Used for subclass instances.
    pub(crate) fn subclass_instance(&self) -> CallRecorder {
        let state = self.state.borrow();
        CallRecorder {
            state: Rc::new(RefCell::new(RecorderState {
                id: Uuid::new_v4(),
                log: state.log.clone(),
                constructors: HashSet::new(),
                members: HashMap::new(),
                deep_equal: state.deep_equal.clone(),
            })),
        }
    }

    pub fn id(&self) -> Uuid {
        self.state.borrow().id
    }

    /// Two handles refer to the same recorder.
    pub fn ptr_eq(&self, other: &CallRecorder) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Two recorders append to the same log store. True for a recorder and
    /// any subclass instance built from it.
    pub fn shares_log_with(&self, other: &CallRecorder) -> bool {
        Rc::ptr_eq(&self.state.borrow().log, &other.state.borrow().log)
    }

    /// Wrap this recorder as a double.
    pub fn as_double(&self) -> Double {
        Double::wrap(self)
    }

    /// Append an argument list to the log for `name`.
    pub fn log_call(&self, name: &str, args: Vec<Value>) {
        trace!(recorder = %self.id(), member = name, argc = args.len(), "call recorded");
        let log = self.state.borrow().log.clone();
        log.borrow_mut()
            .entry(name.to_string())
            .or_insert_with(Vec::new)
            .push(args);
    }

    /// Catch-all handler: record the call, then return a chainable double
    /// over this recorder so further undefined members can be called on the
    /// result.
    pub fn record_undefined(&self, name: &str, args: Vec<Value>) -> Value {
        self.log_call(name, args);
        Value::Double(self.as_double())
    }

    /// Clear the whole log in place. Installed members, registered mocks and
    /// constructor flags are untouched; subclass instances keep observing
    /// the (now empty) shared store.
    pub fn reset(&self) {
        trace!(recorder = %self.id(), "log reset");
        let log = self.state.borrow().log.clone();
        log.borrow_mut().clear();
    }

    /// Install a real member `name` that records its arguments under `name`
    /// on every call, then invokes `callback` with them and returns its
    /// result (or `Undefined` without one).
    ///
    /// The returned callback behaves identically and stands alone, so it can
    /// be handed elsewhere, e.g. as an event handler.
    pub fn spy(&self, name: &str, callback: Option<CallbackFn>) -> CallbackFn {
        trace!(recorder = %self.id(), member = name, "spy installed");
        self.state
            .borrow_mut()
            .members
            .insert(name.to_string(), Member::Spy(callback.clone()));
        self.spy_handle(name, callback)
    }

    /// Standalone callback recording under `name`, not installed as a member.
    pub(crate) fn spy_handle(&self, name: &str, callback: Option<CallbackFn>) -> CallbackFn {
        let recorder = self.clone();
        let name = name.to_string();
        Rc::new(move |args: Vec<Value>| recorder.run_spy(&name, &callback, args))
    }

    /// Record, then run the spy callback if one was supplied.
    pub(crate) fn run_spy(
        &self,
        name: &str,
        callback: &Option<CallbackFn>,
        args: Vec<Value>,
    ) -> Result<Value, crate::error::EngineError> {
        self.log_call(name, args.clone());
        match callback {
            Some(f) => f(args),
            None => Ok(Value::Undefined),
        }
    }

    /// True iff some recorded argument list for `name` compares equal to
    /// `expected`. A comparison error is treated as "no match".
    pub fn was_called_with_arguments(&self, name: &str, expected: &[Value]) -> bool {
        let (log, deep_equal) = {
            let state = self.state.borrow();
            (state.log.clone(), state.deep_equal.clone())
        };
        let calls = match log.borrow().get(name) {
            Some(calls) => calls.clone(),
            None => return false,
        };
        calls
            .iter()
            .any(|recorded| deep_equal(expected, recorded).is_ok())
    }

    /// The argument list of the call to `name` at `index`, in call order.
    /// `None` if `name` was never called or `index` is out of range.
    pub fn call_arguments(&self, name: &str, index: usize) -> Option<Vec<Value>> {
        let log = self.state.borrow().log.clone();
        let borrowed = log.borrow();
        borrowed.get(name).and_then(|calls| calls.get(index).cloned())
    }

    /// The arguments of the first call to `name`.
    pub fn first_call_arguments(&self, name: &str) -> Option<Vec<Value>> {
        self.call_arguments(name, 0)
    }

    /// The full ordered call history for `name`, or `None` if never called.
    pub fn all_call_arguments(&self, name: &str) -> Option<Vec<Vec<Value>>> {
        let log = self.state.borrow().log.clone();
        let borrowed = log.borrow();
        borrowed.get(name).cloned()
    }

    /// Number of recorded calls to `name`.
    pub fn call_count(&self, name: &str) -> usize {
        self.all_call_arguments(name).map_or(0, |calls| calls.len())
    }

    /// Flag `name` as constructor-like, so a double treats access to it as a
    /// constructible function rather than a plain forwarding call.
    pub fn register_constructor(&self, name: &str) {
        self.state
            .borrow_mut()
            .constructors
            .insert(name.to_string());
    }

    pub(crate) fn is_constructor(&self, name: &str) -> bool {
        self.state.borrow().constructors.contains(name)
    }

    /// Install or overwrite a plain attribute.
    pub fn set_attribute(&self, name: &str, value: Value) {
        trace!(recorder = %self.id(), member = name, "attribute installed");
        self.state
            .borrow_mut()
            .members
            .insert(name.to_string(), Member::Attribute(value));
    }

    pub(crate) fn member(&self, name: &str) -> Option<Member> {
        self.state.borrow().members.get(name).cloned()
    }

    pub(crate) fn remove_member(&self, name: &str) {
        self.state.borrow_mut().members.remove(name);
    }

    /// Drop the whole history of one member. Used when a module is unmocked.
    pub(crate) fn delete_calls(&self, name: &str) {
        let log = self.state.borrow().log.clone();
        log.borrow_mut().remove(name);
    }
}
