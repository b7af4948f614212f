//! Test-scoped registry mapping dependency names to substitute export
//! surfaces.
//!
//! `resolve` is the one seam code under test must route dependency
//! acquisition through to remain mockable: it checks the registry before
//! falling back to the real loader. The registry is an ordinary value passed
//! explicitly (or shared behind `Rc<RefCell<..>>` with a sandbox), not
//! ambient global state.

use std::collections::HashMap;

use tracing::debug;

use crate::double::recorder::CallRecorder;
use crate::double::value::{CallbackFn, Value};
use crate::error::EngineError;

/// One member of a mocked module's export surface.
pub enum MemberSpec {
    /// Export a no-callback spy under this name.
    Name(String),
    /// Export a spy wrapping the callback.
    Callback(String, CallbackFn),
    /// Export a plain attribute.
    Attribute(String, Value),
}

impl MemberSpec {
    pub fn name(&self) -> &str {
        match self {
            MemberSpec::Name(n) => n,
            MemberSpec::Callback(n, _) => n,
            MemberSpec::Attribute(n, _) => n,
        }
    }
}

struct ModuleMock {
    surface: Value,
    recorder: Option<CallRecorder>,
    exported: Vec<String>,
}

/// Registry of active module mocks. At most one export surface per name.
#[derive(Default)]
pub struct MockRegistry {
    modules: HashMap<String, ModuleMock>,
}

impl MockRegistry {
    pub fn new() -> Self {
        MockRegistry {
            modules: HashMap::new(),
        }
    }

    /// Store or replace the export surface under `name`.
    pub fn register_module(&mut self, name: &str, surface: Value) {
        debug!(module = name, "module registered");
        self.modules.insert(
            name.to_string(),
            ModuleMock {
                surface,
                recorder: None,
                exported: Vec::new(),
            },
        );
    }

    /// The registered surface, if any. Does not consult a fallback.
    pub fn registered(&self, name: &str) -> Option<Value> {
        self.modules.get(name).map(|m| m.surface.clone())
    }

    pub fn is_mocked(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// The registered surface for `name`, or whatever the real loader
    /// produces for it.
    pub fn resolve<F>(&self, name: &str, fallback: F) -> Result<Value, EngineError>
    where
        F: FnOnce(&str) -> Result<Value, EngineError>,
    {
        match self.registered(name) {
            Some(surface) => {
                debug!(module = name, "resolved to mock");
                Ok(surface)
            }
            None => {
                debug!(module = name, "resolved through fallback loader");
                fallback(name)
            }
        }
    }

    /// The recorder already bound to `name`, or a fresh recorder mocked
    /// under `name` with zero exported members. Repeated resolutions of the
    /// same name through one registry always yield the identical recorder,
    /// so dependency-loader caching elsewhere cannot produce divergent
    /// mocks.
    pub fn cached_recorder(&mut self, name: &str) -> CallRecorder {
        if let Some(recorder) = self
            .modules
            .get(name)
            .and_then(|m| m.recorder.as_ref())
        {
            return recorder.clone();
        }
        let recorder = CallRecorder::new();
        self.mock_module(&recorder, name, Vec::new());
        recorder
    }

    /// Rebuild the export surface for `name` from `specs`, installing every
    /// member on `recorder`. Re-invoking for the same name first clears the
    /// prior exports, so repeated calls are idempotent with respect to the
    /// latest spec.
    pub fn mock_module(&mut self, recorder: &CallRecorder, name: &str, specs: Vec<MemberSpec>) {
        if let Some(previous) = self.modules.remove(name) {
            for member in &previous.exported {
                recorder.remove_member(member);
            }
        }
        let mut exported = Vec::with_capacity(specs.len());
        for spec in specs {
            exported.push(spec.name().to_string());
            match spec {
                MemberSpec::Name(n) => {
                    recorder.spy(&n, None);
                }
                MemberSpec::Callback(n, f) => {
                    recorder.spy(&n, Some(f));
                }
                MemberSpec::Attribute(n, v) => {
                    recorder.set_attribute(&n, v);
                }
            }
        }
        debug!(module = name, exports = exported.len(), "module mocked");
        self.modules.insert(
            name.to_string(),
            ModuleMock {
                surface: Value::Double(recorder.as_double()),
                recorder: Some(recorder.clone()),
                exported,
            },
        );
    }

    /// Remove the mock for `name`: every exported member is removed from the
    /// surface and from `recorder`, and its log entries are deleted. After
    /// this, `resolve` falls through to the real loader again.
    pub fn unmock_module(&mut self, recorder: &CallRecorder, name: &str) {
        if let Some(mock) = self.modules.remove(name) {
            debug!(module = name, "module unmocked");
            for member in &mock.exported {
                recorder.remove_member(member);
                recorder.delete_calls(member);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_the_registered_surface() {
        let mut registry = MockRegistry::new();
        registry.register_module("dep", Value::str("mocked"));
        let resolved = registry
            .resolve("dep", |_| panic!("fallback must not run"))
            .unwrap();
        assert_eq!(resolved, Value::str("mocked"));
    }

    #[test]
    fn resolve_falls_back_when_unregistered() {
        let registry = MockRegistry::new();
        let resolved = registry
            .resolve("dep", |name| Ok(Value::str(format!("real:{}", name))))
            .unwrap();
        assert_eq!(resolved, Value::str("real:dep"));
    }

    #[test]
    fn cached_recorder_is_identity_stable() {
        let mut registry = MockRegistry::new();
        let a = registry.cached_recorder("dep");
        let b = registry.cached_recorder("dep");
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn remocking_clears_prior_exports() {
        let mut registry = MockRegistry::new();
        let recorder = CallRecorder::new();
        registry.mock_module(
            &recorder,
            "dep",
            vec![MemberSpec::Name("old".to_string())],
        );
        registry.mock_module(
            &recorder,
            "dep",
            vec![MemberSpec::Name("new".to_string())],
        );
        let double = recorder.as_double();
        // "old" is gone, so invoking it hits the catch-all instead of a spy.
        assert!(double.get("old").is_undefined());
        match double.get("new") {
            Value::Callback(_) => {}
            other => panic!("expected the new spy, got {:?}", other),
        }
    }
}
