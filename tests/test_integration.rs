//! End-to-end scenarios: scripts under test run in a sandbox against
//! injected doubles, and the test inspects what they did.

extern crate doppel;

use std::rc::Rc;

use doppel::double::{CallRecorder, Value, CLASS_CALL};
use doppel::sandbox::Sandbox;
use pretty_assertions::assert_eq;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

fn script(name: &str) -> String {
    format!("tests/scripts/{}", name)
}

/// Load the route script against a doubled `app`, pull the registered
/// handler back out of the call log, and drive it with doubled
/// request/response objects.
fn run_status_handler(status_type: &str) -> (CallRecorder, CallRecorder) {
    let app = CallRecorder::new();
    let mut sandbox = Sandbox::new();
    sandbox.add_global("app", Value::Double(app.as_double()));
    sandbox.add_global(
        "getNetworkStatus",
        Value::callback(|_| Ok(Value::str("network up"))),
    );
    sandbox.add_global(
        "getSensorsStatus",
        Value::callback(|_| Ok(Value::str("sensors nominal"))),
    );
    sandbox.add_global(
        "getAllStatii",
        Value::callback(|_| Ok(Value::str("all good"))),
    );
    sandbox.load(script("status.js")).unwrap();

    let registration = app.first_call_arguments("all").expect("route registered");
    assert_eq!(registration[0], Value::str("/status"));
    let handler = match &registration[1] {
        Value::Callback(f) => f.clone(),
        other => panic!("expected the route handler, got {:?}", other),
    };

    let request = CallRecorder::new();
    request.set_attribute(
        "query",
        Value::map(vec![("statusType", Value::str(status_type))]),
    );
    let response = CallRecorder::new();
    handler(vec![
        Value::Double(request.as_double()),
        Value::Double(response.as_double()),
    ])
    .unwrap();
    (request, response)
}

#[test]
fn status_route_writes_the_network_status() {
    init_tracing();
    let (_, response) = run_status_handler("network");
    assert!(response.was_called_with_arguments(
        "setHeader",
        &[Value::str("content-type"), Value::str("application/json")],
    ));
    assert!(response.was_called_with_arguments(
        "setHeader",
        &[Value::str("cache-control"), Value::str("no-cache")],
    ));
    assert!(response.was_called_with_arguments("write", &[Value::str("network up")]));
    assert_eq!(response.all_call_arguments("end"), Some(vec![vec![]]));
}

#[test]
fn status_route_dispatches_on_the_query_parameter() {
    init_tracing();
    let (_, response) = run_status_handler("sensors");
    assert!(response.was_called_with_arguments("write", &[Value::str("sensors nominal")]));
    let (_, response) = run_status_handler("all");
    assert!(response.was_called_with_arguments("write", &[Value::str("all good")]));
}

#[test]
fn status_route_writes_undefined_for_unknown_types() {
    init_tracing();
    let (_, response) = run_status_handler("bogus");
    assert!(response.was_called_with_arguments("write", &[Value::Undefined]));
}

#[test]
fn model_definition_and_instantiation_are_observable() {
    init_tracing();
    let mongoose = CallRecorder::new();
    let class = mongoose.create_class(Rc::new(|_, _| Ok(())));
    let class_for_spy = class.clone();
    mongoose.spy(
        "model",
        Some(Rc::new(move |_| Ok(Value::Class(class_for_spy.clone())))),
    );

    let mut sandbox = Sandbox::new();
    sandbox.add_global("mongoose", Value::Double(mongoose.as_double()));
    sandbox.load(script("mongoose_example.js")).unwrap();

    // `{ name: String }` closes over the seeded String built-in, so the
    // match has to compare that callback by identity.
    let string_builtin = sandbox.global("String").unwrap();
    assert!(mongoose.was_called_with_arguments(
        "model",
        &[
            Value::str("Cat"),
            Value::map(vec![("name", string_builtin)]),
        ],
    ));

    // `new Cat(..)` went through the shared-log class.
    assert_eq!(
        mongoose.all_call_arguments(CLASS_CALL),
        Some(vec![vec![Value::map(vec![("name", Value::str("Zildjian"))])]])
    );

    // `kitty.save(callback)` was recorded with the callback argument.
    let save_args = mongoose.first_call_arguments("save").expect("save called");
    assert_eq!(save_args.len(), 1);
    assert!(matches!(save_args[0], Value::Callback(_)));
}
