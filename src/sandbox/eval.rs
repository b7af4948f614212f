//! Tree-walking evaluator for the script subset.
//!
//! Evaluation is fully synchronous and blocking. Scripts can only reach the
//! bindings placed in their scope chain: there is no route to host-process
//! state.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::double::value::{NumberType, Value};
use crate::error::EngineError;
use crate::sandbox::ast::{AssignTarget, BinaryOp, Expression, Literal, Statement, UnaryOp};

/// One lexical scope. Function bodies run in a child of the scope the
/// function expression was evaluated in, so closures capture by reference.
pub struct Scope {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn root() -> Rc<Scope> {
        Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    pub fn child(parent: &Rc<Scope>) -> Rc<Scope> {
        Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        })
    }

    /// Resolve a name through the scope chain.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Bind a name in this scope, shadowing any outer binding.
    pub fn declare(&self, name: &str, value: Value) {
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }

    /// Assign to the nearest scope already holding `name`; an unbound name
    /// lands in this scope, matching the sloppy global behavior scripts
    /// expect.
    pub fn assign(&self, name: &str, value: Value) {
        if self.assign_existing(name, &value) {
            return;
        }
        self.declare(name, value);
    }

    fn assign_existing(&self, name: &str, value: &Value) -> bool {
        if self.bindings.borrow().contains_key(name) {
            self.bindings
                .borrow_mut()
                .insert(name.to_string(), value.clone());
            return true;
        }
        match &self.parent {
            Some(p) => p.assign_existing(name, value),
            None => false,
        }
    }
}

/// Result of executing a statement.
pub enum Completion {
    Normal(Value),
    Return(Value),
}

/// Execute a statement list, stopping at the first `return`.
pub fn execute_statements(
    statements: &[Statement],
    scope: &Rc<Scope>,
) -> Result<Completion, EngineError> {
    let mut completion = Completion::Normal(Value::Undefined);
    for statement in statements {
        completion = execute_statement(statement, scope)?;
        if let Completion::Return(_) = completion {
            return Ok(completion);
        }
    }
    Ok(completion)
}

fn execute_statement(statement: &Statement, scope: &Rc<Scope>) -> Result<Completion, EngineError> {
    match statement {
        Statement::Var(declarations) => {
            for (name, init) in declarations {
                let value = match init {
                    Some(expr) => evaluate_expression(expr, scope)?,
                    None => Value::Undefined,
                };
                scope.declare(name, value);
            }
            Ok(Completion::Normal(Value::Undefined))
        }
        Statement::If {
            test,
            consequent,
            alternate,
        } => {
            if evaluate_expression(test, scope)?.truthy() {
                execute_statements(consequent, scope)
            } else if let Some(alternate) = alternate {
                execute_statements(alternate, scope)
            } else {
                Ok(Completion::Normal(Value::Undefined))
            }
        }
        Statement::Return(argument) => {
            let value = match argument {
                Some(expr) => evaluate_expression(expr, scope)?,
                None => Value::Undefined,
            };
            Ok(Completion::Return(value))
        }
        Statement::Expression(expr) => {
            Ok(Completion::Normal(evaluate_expression(expr, scope)?))
        }
    }
}

/// Evaluate an expression to a value.
pub fn evaluate_expression(expr: &Expression, scope: &Rc<Scope>) -> Result<Value, EngineError> {
    match expr {
        Expression::Literal(literal) => Ok(evaluate_literal(literal)),

        Expression::Identifier(name) => scope.lookup(name).ok_or_else(|| {
            EngineError::Reference(format!("'{}' is not defined", name))
        }),

        Expression::Assignment { target, value } => {
            let value = evaluate_expression(value, scope)?;
            match target {
                AssignTarget::Identifier(name) => scope.assign(name, value.clone()),
                AssignTarget::Member { object, property } => {
                    let object = evaluate_expression(object, scope)?;
                    set_member(&object, property, value.clone())?;
                }
            }
            Ok(value)
        }

        Expression::Binary { op, left, right } => {
            let left = evaluate_expression(left, scope)?;
            let right = evaluate_expression(right, scope)?;
            evaluate_binary(*op, &left, &right)
        }

        Expression::Unary { op, argument } => {
            let value = evaluate_expression(argument, scope)?;
            match op {
                UnaryOp::Not => Ok(Value::Boolean(!value.truthy())),
                UnaryOp::Negate => match value {
                    Value::Number(NumberType::Integer(i)) => Ok(Value::int(-i)),
                    Value::Number(NumberType::Float(f)) => Ok(Value::float(-f)),
                    other => Err(EngineError::Type(format!(
                        "cannot negate a {}",
                        other.type_name()
                    ))),
                },
            }
        }

        Expression::Member { object, property } => {
            let object = evaluate_expression(object, scope)?;
            get_member(&object, property)
        }

        Expression::Call { callee, arguments } => {
            let args = evaluate_arguments(arguments, scope)?;
            match &**callee {
                // Method call: dispatch through the receiver.
                Expression::Member { object, property } => {
                    let receiver = evaluate_expression(object, scope)?;
                    call_member(&receiver, property, args)
                }
                _ => {
                    let callee = evaluate_expression(callee, scope)?;
                    call_value(&callee, args)
                }
            }
        }

        Expression::New { callee, arguments } => {
            let args = evaluate_arguments(arguments, scope)?;
            match &**callee {
                Expression::Member { object, property } => {
                    let receiver = evaluate_expression(object, scope)?;
                    match receiver {
                        // Constructor-like member on a double.
                        Value::Double(double) => {
                            Ok(Value::Double(double.construct(property, args)?))
                        }
                        other => {
                            let callee = get_member(&other, property)?;
                            construct_value(&callee, args)
                        }
                    }
                }
                _ => {
                    let callee = evaluate_expression(callee, scope)?;
                    construct_value(&callee, args)
                }
            }
        }

        Expression::Function { params, body } => {
            let params = params.clone();
            let body = body.clone();
            let closure = scope.clone();
            Ok(Value::Callback(Rc::new(move |args: Vec<Value>| {
                let fn_scope = Scope::child(&closure);
                for (i, param) in params.iter().enumerate() {
                    fn_scope.declare(param, args.get(i).cloned().unwrap_or(Value::Undefined));
                }
                match execute_statements(&body, &fn_scope)? {
                    Completion::Return(value) => Ok(value),
                    Completion::Normal(_) => Ok(Value::Undefined),
                }
            })))
        }

        Expression::Object(properties) => {
            let map = Value::empty_map();
            if let Value::Map(m) = &map {
                for (key, value) in properties {
                    let value = evaluate_expression(value, scope)?;
                    m.borrow_mut().insert(key.clone(), value);
                }
            }
            Ok(map)
        }

        Expression::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(evaluate_expression(item, scope)?);
            }
            Ok(Value::list(values))
        }
    }
}

fn evaluate_arguments(
    arguments: &[Expression],
    scope: &Rc<Scope>,
) -> Result<Vec<Value>, EngineError> {
    let mut values = Vec::with_capacity(arguments.len());
    for argument in arguments {
        values.push(evaluate_expression(argument, scope)?);
    }
    Ok(values)
}

fn evaluate_literal(literal: &Literal) -> Value {
    match literal {
        Literal::Undefined => Value::Undefined,
        Literal::Null => Value::Null,
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Integer(i) => Value::int(*i),
        Literal::Float(f) => Value::float(*f),
        Literal::String(s) => Value::str(s.clone()),
    }
}

/// Read a member off a value.
fn get_member(object: &Value, property: &str) -> Result<Value, EngineError> {
    match object {
        Value::Map(m) => Ok(m.borrow().get(property).cloned().unwrap_or(Value::Undefined)),
        Value::Double(d) => Ok(d.get(property)),
        Value::List(l) if property == "length" => Ok(Value::int(l.borrow().len() as i64)),
        Value::String(s) if property == "length" => Ok(Value::int(s.chars().count() as i64)),
        other => Err(EngineError::Type(format!(
            "cannot read member '{}' of {}",
            property,
            other.type_name()
        ))),
    }
}

fn set_member(object: &Value, property: &str, value: Value) -> Result<(), EngineError> {
    match object {
        Value::Map(m) => {
            m.borrow_mut().insert(property.to_string(), value);
            Ok(())
        }
        Value::Double(d) => {
            d.set(property, value);
            Ok(())
        }
        other => Err(EngineError::Type(format!(
            "cannot assign member '{}' on {}",
            property,
            other.type_name()
        ))),
    }
}

/// Dispatch a method call through the receiver.
fn call_member(receiver: &Value, name: &str, args: Vec<Value>) -> Result<Value, EngineError> {
    match receiver {
        // Doubles intercept every member, defined or not.
        Value::Double(d) => d.invoke(name, args),
        Value::Map(m) => {
            let member = m.borrow().get(name).cloned();
            match member {
                Some(value) => call_value(&value, args),
                None => Err(EngineError::Type(format!(
                    "member '{}' is not a function",
                    name
                ))),
            }
        }
        other => Err(EngineError::Type(format!(
            "cannot call member '{}' of {}",
            name,
            other.type_name()
        ))),
    }
}

fn call_value(callee: &Value, args: Vec<Value>) -> Result<Value, EngineError> {
    match callee {
        Value::Callback(f) => f(args),
        Value::Class(class) => Ok(Value::Double(class.instantiate(args)?)),
        other => Err(EngineError::Type(format!(
            "a {} is not callable",
            other.type_name()
        ))),
    }
}

fn construct_value(callee: &Value, args: Vec<Value>) -> Result<Value, EngineError> {
    match callee {
        Value::Class(class) => Ok(Value::Double(class.instantiate(args)?)),
        Value::Callback(f) => {
            let result = f(args)?;
            // A bare constructor function yields a fresh object.
            if result.is_undefined() {
                Ok(Value::empty_map())
            } else {
                Ok(result)
            }
        }
        other => Err(EngineError::Type(format!(
            "a {} is not constructible",
            other.type_name()
        ))),
    }
}

fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EngineError> {
    match op {
        BinaryOp::Add => add_values(left, right),
        BinaryOp::Subtract => numeric_op(left, right, "-", |a, b| a - b, |a, b| a - b),
        BinaryOp::Multiply => numeric_op(left, right, "*", |a, b| a * b, |a, b| a * b),
        BinaryOp::Divide => match (number_of(left), number_of(right)) {
            (Some(a), Some(b)) => Ok(Value::float(a / b)),
            _ => Err(binary_type_error("/", left, right)),
        },
        BinaryOp::StrictEquals => Ok(Value::Boolean(strict_equals(left, right))),
        BinaryOp::StrictNotEquals => Ok(Value::Boolean(!strict_equals(left, right))),
        BinaryOp::LessThan => compare_values(left, right, "<", |o| o.is_lt()),
        BinaryOp::GreaterThan => compare_values(left, right, ">", |o| o.is_gt()),
        BinaryOp::LessThanOrEqual => compare_values(left, right, "<=", |o| o.is_le()),
        BinaryOp::GreaterThanOrEqual => compare_values(left, right, ">=", |o| o.is_ge()),
    }
}

/// `===` semantics: value comparison for primitives, identity for lists,
/// maps, callbacks, doubles and classes.
fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
        (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
        _ => left == right,
    }
}

fn add_values(left: &Value, right: &Value) -> Result<Value, EngineError> {
    match (left, right) {
        (Value::String(a), b) => Ok(Value::str(format!("{}{}", a, b))),
        (a, Value::String(b)) => Ok(Value::str(format!("{}{}", a, b))),
        _ => numeric_op(left, right, "+", |a, b| a + b, |a, b| a + b),
    }
}

fn numeric_op(
    left: &Value,
    right: &Value,
    symbol: &str,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, EngineError> {
    match (left, right) {
        (Value::Number(NumberType::Integer(a)), Value::Number(NumberType::Integer(b))) => {
            Ok(Value::int(int_op(*a, *b)))
        }
        (Value::Number(a), Value::Number(b)) => {
            Ok(Value::float(float_op(a.as_f64(), b.as_f64())))
        }
        _ => Err(binary_type_error(symbol, left, right)),
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(n.as_f64()),
        _ => None,
    }
}

fn compare_values(
    left: &Value,
    right: &Value,
    symbol: &str,
    accept: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, EngineError> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().partial_cmp(&b.as_f64()),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };
    match ordering {
        Some(o) => Ok(Value::Boolean(accept(o))),
        None => Err(binary_type_error(symbol, left, right)),
    }
}

fn binary_type_error(symbol: &str, left: &Value, right: &Value) -> EngineError {
    EngineError::Type(format!(
        "cannot apply '{}' to {} and {}",
        symbol,
        left.type_name(),
        right.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::parser::parse_script;

    fn run(source: &str) -> Rc<Scope> {
        let scope = Scope::root();
        let ast = parse_script(source).unwrap();
        execute_statements(&ast, &scope).unwrap();
        scope
    }

    #[test]
    fn arithmetic_and_variables() {
        let scope = run("var a = 2 + 3 * 4; var b = a - 1;");
        assert_eq!(scope.lookup("a"), Some(Value::int(14)));
        assert_eq!(scope.lookup("b"), Some(Value::int(13)));
    }

    #[test]
    fn string_concatenation() {
        let scope = run("var s = 'a' + 'b' + 1;");
        assert_eq!(scope.lookup("s"), Some(Value::str("ab1")));
    }

    #[test]
    fn if_else_chains_choose_one_branch() {
        let scope = run(
            "var kind = 'sensors'; var out; \
             if (kind === 'network') { out = 1; } \
             else if (kind === 'sensors') { out = 2; } \
             else { out = 3; }",
        );
        assert_eq!(scope.lookup("out"), Some(Value::int(2)));
    }

    #[test]
    fn closures_capture_their_defining_scope() {
        let scope = run("var x = 6; var f = function () { return x; };");
        match scope.lookup("f") {
            Some(Value::Callback(f)) => {
                assert_eq!(f(vec![]).unwrap(), Value::int(6));
            }
            other => panic!("expected a callback, got {:?}", other),
        }
    }

    #[test]
    fn function_arguments_bind_positionally() {
        let scope = run("var add = function (a, b) { return a + b; };");
        match scope.lookup("add") {
            Some(Value::Callback(f)) => {
                assert_eq!(f(vec![Value::int(2), Value::int(3)]).unwrap(), Value::int(5));
                // A missing argument binds undefined, which fails to add.
                assert!(f(vec![Value::int(2)]).is_err());
            }
            other => panic!("expected a callback, got {:?}", other),
        }
    }

    #[test]
    fn object_members_are_shared_by_reference() {
        let scope = run("var o = { a: 1 }; var p = o; p.a = 2;");
        match scope.lookup("o") {
            Some(Value::Map(m)) => {
                assert_eq!(m.borrow().get("a"), Some(&Value::int(2)));
            }
            other => panic!("expected a map, got {:?}", other),
        }
    }

    #[test]
    fn undefined_identifier_is_a_reference_error() {
        let scope = Scope::root();
        let ast = parse_script("missing();").unwrap();
        match execute_statements(&ast, &scope) {
            Err(EngineError::Reference(_)) => {}
            other => panic!("expected a reference error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn iife_runs_immediately() {
        let scope = run("var out = 0; (function () { out = 41 + 1; }());");
        assert_eq!(scope.lookup("out"), Some(Value::int(42)));
    }
}
