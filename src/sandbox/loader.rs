//! Sandboxed script loading.
//!
//! A [`Sandbox`] evaluates source files against its own root scope. Loaded
//! code sees only the safe built-ins, the `module`/`exports` placeholder,
//! whatever globals the caller injected, and a `require` resolver — never
//! host-process state.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use std::cell::RefCell;

use tracing::debug;

use crate::double::registry::MockRegistry;
use crate::double::value::{NumberType, Value};
use crate::error::EngineError;
use crate::sandbox::eval::{execute_statements, Scope};
use crate::sandbox::parser::parse_script;

lazy_static! {
    /// Error constructors seeded into every fresh sandbox.
    static ref ERROR_KINDS: Vec<&'static str> = vec![
        "Error",
        "TypeError",
        "RangeError",
        "ReferenceError",
        "SyntaxError",
    ];
}

/// Isolated evaluation context with an injectable global-binding set and a
/// custom dependency resolver.
///
/// The export placeholder and the installed resolver are deliberately *not*
/// reset between successive [`load`](Sandbox::load) calls on one instance: a
/// second load observes the first load's leftover export state. Callers
/// wanting isolation create one sandbox per load. This mirrors the
/// documented behavior of the original loader and is part of the contract.
pub struct Sandbox {
    root: Rc<Scope>,
    registry: Option<Rc<RefCell<MockRegistry>>>,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    /// A sandbox whose `require` falls through directly to sibling files.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A sandbox whose synthesized `require` consults `registry` before
    /// falling back to sibling files. Loads of nested files share the same
    /// registry.
    pub fn with_registry(registry: Rc<RefCell<MockRegistry>>) -> Self {
        Self::build(Some(registry))
    }

    fn build(registry: Option<Rc<RefCell<MockRegistry>>>) -> Self {
        let root = Scope::root();
        seed_safe_globals(&root);

        // The module/exports placeholder. `exports` aliases the same map, so
        // `exports.x = ..` and `module.exports.x = ..` agree.
        let exports = Value::empty_map();
        let module = Value::map(vec![("exports", exports.clone())]);
        root.declare("module", module);
        root.declare("exports", exports);
        root.declare("require", Value::Undefined);

        Sandbox { root, registry }
    }

    /// Insert or overwrite one global binding, visible to all subsequently
    /// loaded source in this instance.
    pub fn add_global(&mut self, name: &str, value: Value) {
        self.root.declare(name, value);
    }

    /// Read a root binding, e.g. to compare against a seeded built-in by
    /// identity.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.root.lookup(name)
    }

    /// Read the source file, install a `require` resolver scoped to its
    /// directory if none is installed yet, evaluate the source against the
    /// root scope, and return whatever it left in `module.exports`.
    ///
    /// Parse and evaluation errors propagate to the caller.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Value, EngineError> {
        let path = path.as_ref();
        debug!(file = %path.display(), "sandbox load");
        let source = std::fs::read_to_string(path)?;

        if self
            .root
            .lookup("require")
            .map_or(true, |v| v.is_undefined())
        {
            let dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            self.root
                .declare("require", make_resolver(dir, self.registry.clone()));
        }

        let statements = parse_script(&source)?;
        execute_statements(&statements, &self.root)?;
        Ok(self.current_exports())
    }

    fn current_exports(&self) -> Value {
        match self.root.lookup("module") {
            Some(Value::Map(module)) => module
                .borrow()
                .get("exports")
                .cloned()
                .unwrap_or(Value::Undefined),
            _ => Value::Undefined,
        }
    }
}

/// Build the `require` resolver for files under `dir`: a mocked name
/// resolves to its registered export surface; anything else is loaded as a
/// sibling file in a child sandbox sharing the registry.
fn make_resolver(dir: PathBuf, registry: Option<Rc<RefCell<MockRegistry>>>) -> Value {
    Value::Callback(Rc::new(move |args: Vec<Value>| {
        let name = match args.first() {
            Some(Value::String(s)) => s.clone(),
            other => {
                return Err(EngineError::Type(format!(
                    "require expects a module name, got {}",
                    other.map_or("nothing", |v| v.type_name())
                )))
            }
        };
        // Look up the mock first, releasing the borrow before any fallback
        // load can resolve further dependencies.
        let mocked = registry.as_ref().and_then(|r| r.borrow().registered(&name));
        if let Some(surface) = mocked {
            debug!(module = %name, "require resolved to mock");
            return Ok(surface);
        }
        let mut file = dir.join(&name);
        if file.extension().is_none() {
            file.set_extension("js");
        }
        debug!(module = %name, file = %file.display(), "require falling back to file");
        let mut child = match &registry {
            Some(r) => Sandbox::with_registry(r.clone()),
            None => Sandbox::new(),
        };
        child.load(&file)
    }))
}

fn seed_safe_globals(root: &Rc<Scope>) {
    root.declare(
        "Object",
        Value::callback(|args| {
            Ok(args
                .into_iter()
                .next()
                .filter(|v| matches!(v, Value::Map(_)))
                .unwrap_or_else(Value::empty_map))
        }),
    );
    root.declare("Array", Value::callback(|args| Ok(Value::list(args))));
    root.declare(
        "String",
        Value::callback(|args| {
            Ok(Value::str(
                args.first().map_or("undefined".to_string(), |v| v.to_string()),
            ))
        }),
    );
    root.declare(
        "Number",
        Value::callback(|args| Ok(to_number(args.first()))),
    );
    root.declare(
        "Boolean",
        Value::callback(|args| {
            Ok(Value::Boolean(args.first().map_or(false, |v| v.truthy())))
        }),
    );
    for kind in ERROR_KINDS.iter() {
        let name = kind.to_string();
        root.declare(
            kind,
            Value::callback(move |args| {
                Ok(Value::map(vec![
                    ("name", Value::str(name.clone())),
                    (
                        "message",
                        args.into_iter().next().unwrap_or(Value::str("")),
                    ),
                ]))
            }),
        );
    }
}

fn to_number(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Number(n)) => Value::Number(n.clone()),
        Some(Value::String(s)) => {
            if let Ok(i) = s.trim().parse::<i64>() {
                Value::int(i)
            } else if let Ok(f) = s.trim().parse::<f64>() {
                Value::float(f)
            } else {
                Value::Number(NumberType::Float(f64::NAN))
            }
        }
        Some(Value::Boolean(b)) => Value::int(if *b { 1 } else { 0 }),
        _ => Value::Number(NumberType::Float(f64::NAN)),
    }
}
