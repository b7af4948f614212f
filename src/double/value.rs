//! Dynamic value type shared by the recording engine and the sandbox.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::double::subclass::ClassType;
use crate::double::wrap::Double;
use crate::error::EngineError;

/// Callable value. Receives the full argument list and produces a value or
/// an error that propagates to whoever performed the call.
pub type CallbackFn = Rc<dyn Fn(Vec<Value>) -> Result<Value, EngineError>>;

/// A dynamically typed value.
///
/// Lists and maps carry reference semantics (`Rc<RefCell<..>>`): cloning a
/// `Value` clones the handle, not the contents, so a member assignment seen
/// through one handle is visible through every other handle.
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(NumberType),
    String(String),
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<BTreeMap<String, Value>>>),
    Callback(CallbackFn),
    Double(Double),
    Class(ClassType),
}

impl Value {
    pub fn int(n: i64) -> Value {
        Value::Number(NumberType::Integer(n))
    }

    pub fn float(n: f64) -> Value {
        Value::Number(NumberType::Float(n))
    }

    pub fn str(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: Vec<(&str, Value)>) -> Value {
        let mut m = BTreeMap::new();
        for (k, v) in entries {
            m.insert(k.to_string(), v);
        }
        Value::Map(Rc::new(RefCell::new(m)))
    }

    pub fn empty_map() -> Value {
        Value::Map(Rc::new(RefCell::new(BTreeMap::new())))
    }

    pub fn callback(f: impl Fn(Vec<Value>) -> Result<Value, EngineError> + 'static) -> Value {
        Value::Callback(Rc::new(f))
    }

    /// Type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Callback(_) => "function",
            Value::Double(_) => "double",
            Value::Class(_) => "class",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(NumberType::Integer(i)) => *i != 0,
            Value::Number(NumberType::Float(f)) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        match self {
            Value::Undefined => Value::Undefined,
            Value::Null => Value::Null,
            Value::Boolean(b) => Value::Boolean(*b),
            Value::Number(n) => Value::Number(n.clone()),
            Value::String(s) => Value::String(s.to_string()),
            Value::List(l) => Value::List(l.clone()),
            Value::Map(m) => Value::Map(m.clone()),
            Value::Callback(f) => Value::Callback(f.clone()),
            Value::Double(d) => Value::Double(d.clone()),
            Value::Class(c) => Value::Class(c.clone()),
        }
    }
}

/// Structural equality for primitives, lists and maps; identity for
/// callbacks, doubles and classes. Map key order is irrelevant.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Callback(a), Value::Callback(b)) => rc_identity(a, b),
            (Value::Double(a), Value::Double(b)) => a.ptr_eq(b),
            (Value::Class(a), Value::Class(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Identity comparison for `Rc` handles, ignoring vtable metadata.
pub(crate) fn rc_identity<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const u8, Rc::as_ptr(b) as *const u8)
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::List(l) => {
                let items: Vec<String> =
                    l.borrow().iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Map(m) => {
                let entries: Vec<String> = m
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect();
                write!(f, "{{{}}}", entries.join(", "))
            }
            Value::Callback(_) => write!(f, "[function]"),
            Value::Double(d) => write!(f, "[double {}]", d.recorder().id()),
            Value::Class(_) => write!(f, "[class]"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::Number(n) => write!(f, "Number({:?})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::List(l) => write!(f, "List({:?})", l.borrow()),
            Value::Map(m) => write!(f, "Map({:?})", m.borrow()),
            Value::Callback(_) => write!(f, "Callback(..)"),
            Value::Double(d) => write!(f, "Double({})", d.recorder().id()),
            Value::Class(_) => write!(f, "Class(..)"),
        }
    }
}

#[derive(Debug)]
pub enum NumberType {
    Integer(i64),
    Float(f64),
}

impl NumberType {
    pub fn as_f64(&self) -> f64 {
        match self {
            NumberType::Integer(i) => *i as f64,
            NumberType::Float(f) => *f,
        }
    }
}

impl Clone for NumberType {
    fn clone(&self) -> Self {
        match self {
            NumberType::Integer(i) => NumberType::Integer(*i),
            NumberType::Float(f) => NumberType::Float(*f),
        }
    }
}

/// Numeric comparison across the integer/float split, so `1` and `1.0`
/// recorded through different paths still match.
impl PartialEq for NumberType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NumberType::Integer(a), NumberType::Integer(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl Display for NumberType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            NumberType::Integer(i) => write!(f, "{}", i),
            NumberType::Float(n) => write!(f, "{}", n),
        }
    }
}
