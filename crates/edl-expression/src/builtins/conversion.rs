//! Conversion built-ins.

use super::arg;
use crate::error::ExprError;
use crate::types::{Arity, BuiltinDefinition, JsValue};
use crate::util;
use std::sync::Arc;

fn to_string_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::String(util::str_val(arg(args, 0))))
}

fn to_number_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Number(util::num(arg(args, 0))))
}

fn to_boolean_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Bool(util::is_truthy(arg(args, 0))))
}

fn parse_int_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let text = util::str_val(arg(args, 0));
    let radix = match arg(args, 1) {
        JsValue::Undefined => 0,
        v => util::int(v),
    };
    Ok(JsValue::Number(parse_int(&text, radix)))
}

/// Parses the longest integer prefix. Radix 0 means "10, or 16 after a
/// `0x` prefix".
pub fn parse_int(text: &str, radix: i64) -> f64 {
    let mut s = text.trim_start();
    let negative = s.starts_with('-');
    if negative || s.starts_with('+') {
        s = &s[1..];
    }
    let mut radix = radix;
    if radix != 0 && !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    if radix == 0 || radix == 16 {
        if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            s = rest;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    let mut value = 0.0f64;
    let mut digits = 0;
    for c in s.chars() {
        let Some(d) = c.to_digit(radix as u32) else {
            break;
        };
        value = value * radix as f64 + d as f64;
        digits += 1;
    }
    if digits == 0 {
        return f64::NAN;
    }
    if negative {
        -value
    } else {
        value
    }
}

fn parse_float_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::Number(parse_float(&util::str_val(arg(args, 0)))))
}

/// Parses the longest decimal prefix, exponent included.
pub fn parse_float(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };
    let int_end = digits_from(end);
    let mut mantissa_end = int_end;
    if bytes.get(int_end) == Some(&b'.') {
        mantissa_end = digits_from(int_end + 1);
    }
    // A lone "." or sign has no digits.
    if mantissa_end - end <= usize::from(mantissa_end > int_end) {
        return f64::NAN;
    }
    end = mantissa_end;
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

fn to_fixed_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let n = util::num(arg(args, 0));
    let digits = util::int(arg(args, 1));
    if !(0..=100).contains(&digits) {
        return Err(ExprError::type_error(
            "toFixed() digits argument must be between 0 and 100",
        ));
    }
    if !n.is_finite() {
        return Ok(JsValue::String(util::format_number(n)));
    }
    Ok(JsValue::String(format!("{:.*}", digits as usize, n)))
}

pub fn builtins() -> Vec<Arc<BuiltinDefinition>> {
    vec![
        Arc::new(BuiltinDefinition {
            name: "toString",
            arity: Arity::Fixed(1),
            eval_fn: to_string_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "toNumber",
            arity: Arity::Fixed(1),
            eval_fn: to_number_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "toBoolean",
            arity: Arity::Fixed(1),
            eval_fn: to_boolean_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "parseInt",
            arity: Arity::Range(1, Some(2)),
            eval_fn: parse_int_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "parseFloat",
            arity: Arity::Fixed(1),
            eval_fn: parse_float_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "toFixed",
            arity: Arity::Range(1, Some(2)),
            eval_fn: to_fixed_eval,
        }),
    ]
}
