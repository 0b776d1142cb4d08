//! Array built-ins. Every function returns a new array; inputs are never
//! mutated. Callbacks receive `(element, index, array)`, `reduce` callbacks
//! `(accumulator, element, index, array)`.

use super::{arg, require_array, require_function};
use crate::error::ExprError;
use crate::types::{Arity, BuiltinDefinition, Callable, JsValue};
use crate::util;
use std::cmp::Ordering;
use std::sync::Arc;

fn call_each(
    items: &[JsValue],
    array: &JsValue,
    callback: &Callable,
    mut visit: impl FnMut(&JsValue, JsValue) -> bool,
) -> Result<(), ExprError> {
    for (i, item) in items.iter().enumerate() {
        let result = callback.call(&[item.clone(), JsValue::from(i), array.clone()])?;
        if !visit(item, result) {
            break;
        }
    }
    Ok(())
}

fn map_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let items = require_array("map", arg(args, 0))?;
    let callback = require_function("map", arg(args, 1))?;
    let mut out = Vec::with_capacity(items.len());
    call_each(items, arg(args, 0), callback, |_, result| {
        out.push(result);
        true
    })?;
    Ok(JsValue::Array(out))
}

fn filter_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let items = require_array("filter", arg(args, 0))?;
    let callback = require_function("filter", arg(args, 1))?;
    let mut out = Vec::new();
    call_each(items, arg(args, 0), callback, |item, result| {
        if util::is_truthy(&result) {
            out.push(item.clone());
        }
        true
    })?;
    Ok(JsValue::Array(out))
}

fn find_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let items = require_array("find", arg(args, 0))?;
    let callback = require_function("find", arg(args, 1))?;
    let mut found = JsValue::Undefined;
    call_each(items, arg(args, 0), callback, |item, result| {
        if util::is_truthy(&result) {
            found = item.clone();
            return false;
        }
        true
    })?;
    Ok(found)
}

fn some_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let items = require_array("some", arg(args, 0))?;
    let callback = require_function("some", arg(args, 1))?;
    let mut any = false;
    call_each(items, arg(args, 0), callback, |_, result| {
        any = util::is_truthy(&result);
        !any
    })?;
    Ok(JsValue::Bool(any))
}

fn every_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let items = require_array("every", arg(args, 0))?;
    let callback = require_function("every", arg(args, 1))?;
    let mut all = true;
    call_each(items, arg(args, 0), callback, |_, result| {
        all = util::is_truthy(&result);
        all
    })?;
    Ok(JsValue::Bool(all))
}

/// Without an initial value the first element seeds the fold.
fn reduce_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let array = arg(args, 0);
    let items = require_array("reduce", array)?;
    let callback = require_function("reduce", arg(args, 1))?;
    let (mut acc, skip) = if args.len() > 2 {
        (args[2].clone(), 0)
    } else {
        match items.first() {
            Some(first) => (first.clone(), 1),
            None => {
                return Err(ExprError::type_error(
                    "reduce of empty array with no initial value",
                ))
            }
        }
    };
    for (i, item) in items.iter().enumerate().skip(skip) {
        acc = callback.call(&[acc, item.clone(), JsValue::from(i), array.clone()])?;
    }
    Ok(acc)
}

/// String order, `undefined` last.
fn default_order(a: &JsValue, b: &JsValue) -> Ordering {
    match (a, b) {
        (JsValue::Undefined, JsValue::Undefined) => Ordering::Equal,
        (JsValue::Undefined, _) => Ordering::Greater,
        (_, JsValue::Undefined) => Ordering::Less,
        _ => util::str_val(a).cmp(&util::str_val(b)),
    }
}

/// Stable merge sort with a fallible comparator. `slice::sort_by` is not
/// usable here because user comparators may fail or be inconsistent.
fn merge_sort<F>(items: Vec<JsValue>, cmp: &mut F) -> Result<Vec<JsValue>, ExprError>
where
    F: FnMut(&JsValue, &JsValue) -> Result<Ordering, ExprError>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(left, cmp)?;
    let right = merge_sort(right, cmp)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        let next = if cmp(r, l)? == Ordering::Less {
            right.next()
        } else {
            left.next()
        };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

fn sort_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let items = require_array("sort", arg(args, 0))?.clone();
    let sorted = match arg(args, 1) {
        JsValue::Undefined => merge_sort(items, &mut |a, b| Ok(default_order(a, b)))?,
        comparator => {
            let comparator = require_function("sort", comparator)?;
            merge_sort(items, &mut |a, b| {
                let n = util::num(&comparator.call(&[a.clone(), b.clone()])?);
                Ok(n.partial_cmp(&0.0).unwrap_or(Ordering::Equal))
            })?
        }
    };
    Ok(JsValue::Array(sorted))
}

fn reverse_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let mut items = require_array("reverse", arg(args, 0))?.clone();
    items.reverse();
    Ok(JsValue::Array(items))
}

fn flatten_into(out: &mut Vec<JsValue>, items: &[JsValue], depth: f64) {
    for item in items {
        match item {
            JsValue::Array(inner) if depth >= 1.0 => flatten_into(out, inner, depth - 1.0),
            other => out.push(other.clone()),
        }
    }
}

fn flat_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let items = require_array("flat", arg(args, 0))?;
    let depth = match arg(args, 1) {
        JsValue::Undefined => 1.0,
        v => util::num(v),
    };
    let mut out = Vec::new();
    flatten_into(&mut out, items, if depth.is_nan() { 0.0 } else { depth });
    Ok(JsValue::Array(out))
}

fn flat_map_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let items = require_array("flatMap", arg(args, 0))?;
    let callback = require_function("flatMap", arg(args, 1))?;
    let mut out = Vec::new();
    call_each(items, arg(args, 0), callback, |_, result| {
        match result {
            JsValue::Array(inner) => out.extend(inner),
            other => out.push(other),
        }
        true
    })?;
    Ok(JsValue::Array(out))
}

fn push_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let mut items = require_array("push", arg(args, 0))?.clone();
    items.extend(args.iter().skip(1).cloned());
    Ok(JsValue::Array(items))
}

/// Returns the array without its last element.
fn pop_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let mut items = require_array("pop", arg(args, 0))?.clone();
    items.pop();
    Ok(JsValue::Array(items))
}

/// Returns the array without its first element.
fn shift_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let items = require_array("shift", arg(args, 0))?;
    Ok(JsValue::Array(items.iter().skip(1).cloned().collect()))
}

fn unshift_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let items = require_array("unshift", arg(args, 0))?;
    let mut out: Vec<JsValue> = args.iter().skip(1).cloned().collect();
    out.extend(items.iter().cloned());
    Ok(JsValue::Array(out))
}

pub fn builtins() -> Vec<Arc<BuiltinDefinition>> {
    vec![
        Arc::new(BuiltinDefinition {
            name: "map",
            arity: Arity::Fixed(2),
            eval_fn: map_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "filter",
            arity: Arity::Fixed(2),
            eval_fn: filter_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "find",
            arity: Arity::Fixed(2),
            eval_fn: find_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "reduce",
            arity: Arity::Range(2, Some(3)),
            eval_fn: reduce_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "some",
            arity: Arity::Fixed(2),
            eval_fn: some_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "every",
            arity: Arity::Fixed(2),
            eval_fn: every_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "sort",
            arity: Arity::Range(1, Some(2)),
            eval_fn: sort_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "reverse",
            arity: Arity::Fixed(1),
            eval_fn: reverse_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "flat",
            arity: Arity::Range(1, Some(2)),
            eval_fn: flat_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "flatMap",
            arity: Arity::Fixed(2),
            eval_fn: flat_map_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "push",
            arity: Arity::Range(1, None),
            eval_fn: push_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "pop",
            arity: Arity::Fixed(1),
            eval_fn: pop_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "shift",
            arity: Arity::Fixed(1),
            eval_fn: shift_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "unshift",
            arity: Arity::Range(1, None),
            eval_fn: unshift_eval,
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[f64]) -> JsValue {
        JsValue::Array(values.iter().map(|n| JsValue::from(*n)).collect())
    }

    #[test]
    fn test_merge_sort_is_stable() {
        let pair = |k: f64, tag: &str| JsValue::Array(vec![JsValue::from(k), JsValue::from(tag)]);
        let by_key = Callable::new("byKey", |args| {
            let key = |v: &JsValue| util::num(&util::get_index(v, &JsValue::from(0.0)));
            Ok(JsValue::from(key(&args[0]) - key(&args[1])))
        });
        let input = JsValue::Array(vec![pair(2.0, "a"), pair(1.0, "b"), pair(2.0, "c"), pair(1.0, "d")]);
        let sorted = sort_eval(&[input, JsValue::Function(by_key)]).unwrap();
        assert_eq!(
            sorted,
            JsValue::Array(vec![pair(1.0, "b"), pair(1.0, "d"), pair(2.0, "a"), pair(2.0, "c")])
        );
    }

    #[test]
    fn test_default_sort_compares_strings() {
        assert_eq!(
            sort_eval(&[nums(&[10.0, 9.0, 1.0])]).unwrap(),
            nums(&[1.0, 10.0, 9.0])
        );
    }

    #[test]
    fn test_comparator_error_propagates() {
        let failing = Callable::new("boom", |_| Err(ExprError::Thrown("boom".into())));
        let err = sort_eval(&[nums(&[2.0, 1.0]), JsValue::Function(failing)]).unwrap_err();
        assert_eq!(err, ExprError::Thrown("boom".into()));
    }

    #[test]
    fn test_reduce_without_initial() {
        let product = Callable::new("product", |args| {
            Ok(JsValue::from(util::num(&args[0]) * util::num(&args[1])))
        });
        assert_eq!(
            reduce_eval(&[nums(&[1.0, 2.0, 3.0, 4.0]), JsValue::Function(product.clone())]).unwrap(),
            JsValue::from(24.0)
        );
        assert!(reduce_eval(&[nums(&[]), JsValue::Function(product)]).is_err());
    }

    #[test]
    fn test_flat_depth() {
        let nested = JsValue::Array(vec![nums(&[1.0]), JsValue::Array(vec![nums(&[2.0])])]);
        assert_eq!(
            flat_eval(&[nested.clone()]).unwrap(),
            JsValue::Array(vec![JsValue::from(1.0), nums(&[2.0])])
        );
        assert_eq!(
            flat_eval(&[nested, JsValue::from(f64::INFINITY)]).unwrap(),
            nums(&[1.0, 2.0])
        );
    }

    #[test]
    fn test_requires_array() {
        let identity = Callable::new("identity", |args| Ok(args[0].clone()));
        let err = map_eval(&[JsValue::from("abc"), JsValue::Function(identity)]).unwrap_err();
        assert_eq!(err.to_string(), "map requires an array");
    }
}
