//! Type predicates.

use super::arg;
use crate::error::ExprError;
use crate::types::{Arity, BuiltinDefinition, JsValue};
use std::sync::Arc;

fn is_null_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Bool(matches!(arg(args, 0), JsValue::Null)))
}

fn is_undefined_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Bool(matches!(arg(args, 0), JsValue::Undefined)))
}

fn is_number_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Bool(matches!(arg(args, 0), JsValue::Number(_))))
}

fn is_string_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Bool(matches!(arg(args, 0), JsValue::String(_))))
}

fn is_boolean_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Bool(matches!(arg(args, 0), JsValue::Bool(_))))
}

fn is_array_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Bool(matches!(arg(args, 0), JsValue::Array(_))))
}

/// Plain objects only: arrays and `null` are not objects here.
fn is_object_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Bool(matches!(arg(args, 0), JsValue::Object(_))))
}

pub fn builtins() -> Vec<Arc<BuiltinDefinition>> {
    vec![
        Arc::new(BuiltinDefinition {
            name: "isNull",
            arity: Arity::Fixed(1),
            eval_fn: is_null_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "isUndefined",
            arity: Arity::Fixed(1),
            eval_fn: is_undefined_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "isNumber",
            arity: Arity::Fixed(1),
            eval_fn: is_number_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "isString",
            arity: Arity::Fixed(1),
            eval_fn: is_string_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "isBoolean",
            arity: Arity::Fixed(1),
            eval_fn: is_boolean_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "isArray",
            arity: Arity::Fixed(1),
            eval_fn: is_array_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "isObject",
            arity: Arity::Fixed(1),
            eval_fn: is_object_eval,
        }),
    ]
}
