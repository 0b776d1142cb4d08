//! Arithmetic built-ins. All operands are coerced with `Number()` semantics.

use super::arg;
use crate::error::ExprError;
use crate::types::{Arity, BuiltinDefinition, JsValue};
use crate::util;
use std::sync::Arc;

fn unary(args: &[JsValue], f: fn(f64) -> f64) -> Result<JsValue, ExprError> {
    Ok(JsValue::Number(f(util::num(arg(args, 0)))))
}

fn abs_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    unary(args, f64::abs)
}

fn ceil_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    unary(args, f64::ceil)
}

fn floor_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    unary(args, f64::floor)
}

/// Halves round toward positive infinity: `round(-2.5)` is `-2`.
fn round_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    unary(args, |n| (n + 0.5).floor())
}

fn sqrt_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    unary(args, f64::sqrt)
}

fn min_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let mut result = f64::INFINITY;
    for n in args.iter().map(util::num) {
        if n.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        result = result.min(n);
    }
    Ok(JsValue::Number(result))
}

fn max_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let mut result = f64::NEG_INFINITY;
    for n in args.iter().map(util::num) {
        if n.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        result = result.max(n);
    }
    Ok(JsValue::Number(result))
}

fn pow_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let base = util::num(arg(args, 0));
    let exponent = util::num(arg(args, 1));
    Ok(JsValue::Number(base.powf(exponent)))
}

fn add_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Number(args.iter().map(util::num).sum()))
}

fn subtract_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Number(util::num(arg(args, 0)) - util::num(arg(args, 1))))
}

fn multiply_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Number(args.iter().map(util::num).product()))
}

fn divide_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Number(util::num(arg(args, 0)) / util::num(arg(args, 1))))
}

fn modulo_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Number(util::num(arg(args, 0)) % util::num(arg(args, 1))))
}

pub fn builtins() -> Vec<Arc<BuiltinDefinition>> {
    vec![
        Arc::new(BuiltinDefinition {
            name: "abs",
            arity: Arity::Fixed(1),
            eval_fn: abs_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "ceil",
            arity: Arity::Fixed(1),
            eval_fn: ceil_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "floor",
            arity: Arity::Fixed(1),
            eval_fn: floor_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "round",
            arity: Arity::Fixed(1),
            eval_fn: round_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "sqrt",
            arity: Arity::Fixed(1),
            eval_fn: sqrt_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "min",
            arity: Arity::Any,
            eval_fn: min_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "max",
            arity: Arity::Any,
            eval_fn: max_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "pow",
            arity: Arity::Fixed(2),
            eval_fn: pow_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "add",
            arity: Arity::Any,
            eval_fn: add_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "subtract",
            arity: Arity::Fixed(2),
            eval_fn: subtract_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "multiply",
            arity: Arity::Any,
            eval_fn: multiply_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "divide",
            arity: Arity::Fixed(2),
            eval_fn: divide_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "modulo",
            arity: Arity::Fixed(2),
            eval_fn: modulo_eval,
        }),
    ]
}
