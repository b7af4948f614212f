//! Tests for the module-mock registry and its resolver seam.

extern crate doppel;

use std::rc::Rc;

use doppel::double::{CallRecorder, MemberSpec, MockRegistry, Value};
use pretty_assertions::assert_eq;

fn spy_names(names: &[&str]) -> Vec<MemberSpec> {
    names
        .iter()
        .map(|n| MemberSpec::Name(n.to_string()))
        .collect()
}

fn resolve_double(registry: &MockRegistry, name: &str) -> doppel::double::Double {
    let surface = registry
        .resolve(name, |_| panic!("expected '{}' to be mocked", name))
        .unwrap();
    match surface {
        Value::Double(d) => d,
        other => panic!("expected a double surface, got {:?}", other),
    }
}

#[test]
fn resolve_returns_the_mock_then_falls_back_after_unmock() {
    let mut registry = MockRegistry::new();
    let recorder = CallRecorder::new();
    registry.mock_module(&recorder, "noexist", spy_names(&["callMe"]));

    let dependency = resolve_double(&registry, "noexist");
    dependency.invoke("callMe", vec![]).unwrap();
    assert!(recorder.was_called_with_arguments("callMe", &[]));

    registry.unmock_module(&recorder, "noexist");
    let fell_back = registry
        .resolve("noexist", |name| Ok(Value::str(format!("real:{}", name))))
        .unwrap();
    assert_eq!(fell_back, Value::str("real:noexist"));

    // Re-mocking works after the unmock.
    registry.mock_module(&recorder, "noexist", spy_names(&["callMe"]));
    resolve_double(&registry, "noexist")
        .invoke("callMe", vec![])
        .unwrap();
}

#[test]
fn modules_are_handled_independently() {
    let mut registry = MockRegistry::new();
    let noexist = registry.cached_recorder("noexist");
    let other = registry.cached_recorder("other");
    registry.mock_module(&noexist, "noexist", spy_names(&["callMe"]));
    registry.mock_module(&other, "other", spy_names(&["callMe"]));
    registry.unmock_module(&other, "other");

    resolve_double(&registry, "noexist")
        .invoke("callMe", vec![])
        .unwrap();
    assert!(noexist.was_called_with_arguments("callMe", &[]));
    assert!(!registry.is_mocked("other"));
}

#[test]
fn callback_members_run_and_are_tracked() {
    let mut registry = MockRegistry::new();
    let recorder = CallRecorder::new();
    registry.mock_module(
        &recorder,
        "noexist",
        vec![MemberSpec::Callback(
            "callMe".to_string(),
            Rc::new(|_| Ok(Value::str("called me"))),
        )],
    );
    let dependency = resolve_double(&registry, "noexist");
    assert_eq!(dependency.invoke("callMe", vec![]).unwrap(), Value::str("called me"));
    assert!(recorder.was_called_with_arguments("callMe", &[]));
}

#[test]
fn attribute_members_are_plain_values() {
    let mut registry = MockRegistry::new();
    let recorder = CallRecorder::new();
    registry.mock_module(
        &recorder,
        "noexist",
        vec![MemberSpec::Attribute(
            "myAttribute".to_string(),
            Value::str("myValue"),
        )],
    );
    let dependency = resolve_double(&registry, "noexist");
    assert_eq!(dependency.get("myAttribute"), Value::str("myValue"));
}

#[test]
fn unmock_empties_the_call_log_of_exported_members() {
    let mut registry = MockRegistry::new();
    let recorder = CallRecorder::new();
    registry.mock_module(&recorder, "noexist", spy_names(&["callMe"]));
    resolve_double(&registry, "noexist")
        .invoke("callMe", vec![])
        .unwrap();
    assert!(recorder.was_called_with_arguments("callMe", &[]));

    registry.unmock_module(&recorder, "noexist");
    assert!(!recorder.was_called_with_arguments("callMe", &[]));
    assert_eq!(recorder.all_call_arguments("callMe"), None);
}

#[test]
fn unmock_leaves_unrelated_history_alone() {
    let mut registry = MockRegistry::new();
    let recorder = CallRecorder::new();
    registry.mock_module(&recorder, "noexist", spy_names(&["callMe"]));
    recorder.as_double().invoke("unrelated", vec![]).unwrap();
    registry.unmock_module(&recorder, "noexist");
    assert_eq!(recorder.call_count("unrelated"), 1);
}

#[test]
fn cached_recorder_is_stable_across_resolutions() {
    let mut registry = MockRegistry::new();
    let first = registry.cached_recorder("http");
    let second = registry.cached_recorder("http");
    assert!(first.ptr_eq(&second));

    // A zero-export mock is registered as a side effect.
    assert!(registry.is_mocked("http"));
}

#[test]
fn http_scenario_records_every_spied_call() {
    let mut registry = MockRegistry::new();
    let http = registry.cached_recorder("http");
    registry.mock_module(&http, "http", spy_names(&["setHeader", "write", "end"]));

    let module = resolve_double(&registry, "http");
    module
        .invoke(
            "setHeader",
            vec![Value::str("content-type"), Value::str("application/json")],
        )
        .unwrap();
    module.invoke("write", vec![Value::str("ok")]).unwrap();
    module.invoke("end", vec![]).unwrap();

    assert!(http.was_called_with_arguments(
        "setHeader",
        &[Value::str("content-type"), Value::str("application/json")],
    ));
    assert!(http.was_called_with_arguments("write", &[Value::str("ok")]));
    assert_eq!(http.all_call_arguments("end"), Some(vec![vec![]]));
}
