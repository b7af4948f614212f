//! Structural deep-equality comparison over argument lists.
//!
//! The recorder queries never see a comparison error: a failed comparison is
//! reduced to "no match" by the caller. A custom comparison can be supplied
//! through [`CallRecorder::with_deep_equal`](crate::double::CallRecorder::with_deep_equal)
//! for values that do not compare naturally.

use std::rc::Rc;

use crate::double::value::Value;
use crate::error::EngineError;

/// Comparison function over two argument lists. `Ok(())` means equal.
pub type DeepEqualFn = Rc<dyn Fn(&[Value], &[Value]) -> Result<(), EngineError>>;

/// Compare two argument lists for structural equality.
///
/// Primitives, lists and maps compare by content (map key order irrelevant);
/// callbacks, doubles and classes compare by identity.
pub fn deep_equal(expected: &[Value], actual: &[Value]) -> Result<(), EngineError> {
    if expected.len() != actual.len() {
        return Err(EngineError::Mismatch(format!(
            "expected {} arguments, found {}",
            expected.len(),
            actual.len()
        )));
    }
    for (i, (e, a)) in expected.iter().zip(actual.iter()).enumerate() {
        if e != a {
            return Err(EngineError::Mismatch(format!(
                "argument {} differs: expected {:?}, found {:?}",
                i, e, a
            )));
        }
    }
    Ok(())
}

/// The default comparison installed on every fresh recorder.
pub fn default_deep_equal() -> DeepEqualFn {
    Rc::new(deep_equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::double::value::Value;

    #[test]
    fn equal_primitives_match() {
        assert!(deep_equal(
            &[Value::int(1), Value::str("a"), Value::Boolean(true)],
            &[Value::int(1), Value::str("a"), Value::Boolean(true)],
        )
        .is_ok());
    }

    #[test]
    fn map_key_order_is_irrelevant() {
        let a = Value::map(vec![("x", Value::int(1)), ("y", Value::int(2))]);
        let b = Value::map(vec![("y", Value::int(2)), ("x", Value::int(1))]);
        assert!(deep_equal(&[a], &[b]).is_ok());
    }

    #[test]
    fn differing_values_do_not_match() {
        let a = Value::map(vec![("x", Value::int(1))]);
        let b = Value::map(vec![("x", Value::int(2))]);
        assert!(deep_equal(&[a], &[b]).is_err());
    }

    #[test]
    fn length_mismatch_is_an_error() {
        assert!(deep_equal(&[Value::int(1)], &[]).is_err());
    }

    #[test]
    fn integer_and_float_compare_numerically() {
        assert!(deep_equal(&[Value::int(2)], &[Value::float(2.0)]).is_ok());
    }

    #[test]
    fn callbacks_compare_by_identity() {
        let f = Value::callback(|_| Ok(Value::Undefined));
        let g = Value::callback(|_| Ok(Value::Undefined));
        assert!(deep_equal(&[f.clone()], &[f.clone()]).is_ok());
        assert!(deep_equal(&[f], &[g]).is_err());
    }

    #[test]
    fn nested_structures_compare_recursively() {
        let a = Value::map(vec![(
            "inner",
            Value::list(vec![Value::int(1), Value::str("two")]),
        )]);
        let b = Value::map(vec![(
            "inner",
            Value::list(vec![Value::int(1), Value::str("two")]),
        )]);
        assert!(deep_equal(&[a], &[b]).is_ok());
    }
}
