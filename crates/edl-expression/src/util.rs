//! Coercion and comparison helpers shared by the interpreter, the built-ins
//! and the structural evaluator.

use crate::error::ExprError;
use crate::types::JsValue;
use std::cmp::Ordering;

// ----------------------------------------------------------------- Sandbox

/// Names that never resolve, whatever the context holds.
pub const DENIED_NAMES: &[&str] = &["constructor", "prototype", "__proto__"];

/// `constructor`, `prototype` and dunder-style internal names.
pub fn is_denied(name: &str) -> bool {
    DENIED_NAMES.contains(&name)
        || (name.len() > 4 && name.starts_with("__") && name.ends_with("__"))
}

pub fn check_access(name: &str) -> Result<(), ExprError> {
    if is_denied(name) {
        tracing::warn!(name, "sandbox denied access");
        return Err(ExprError::SandboxViolation(name.to_string()));
    }
    Ok(())
}

// ----------------------------------------------------------------- Coercion

pub fn is_truthy(value: &JsValue) -> bool {
    match value {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Bool(b) => *b,
        JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Array(_) | JsValue::Object(_) | JsValue::Function(_) => true,
    }
}

/// `Number(value)`.
pub fn num(value: &JsValue) -> f64 {
    match value {
        JsValue::Undefined => f64::NAN,
        JsValue::Null => 0.0,
        JsValue::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        JsValue::Number(n) => *n,
        JsValue::String(s) => parse_numeric_string(s),
        JsValue::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => num(single),
            _ => f64::NAN,
        },
        JsValue::Object(_) | JsValue::Function(_) => f64::NAN,
    }
}

fn parse_numeric_string(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    // Rust accepts "inf"/"nan" spellings that Number() does not.
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
    {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// Truncates toward zero; NaN becomes 0.
pub fn int(value: &JsValue) -> i64 {
    let n = num(value);
    if n.is_nan() {
        0
    } else {
        n.trunc() as i64
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

/// `String(value)`.
pub fn str_val(value: &JsValue) -> String {
    match value {
        JsValue::Undefined => "undefined".to_string(),
        JsValue::Null => "null".to_string(),
        JsValue::Bool(b) => b.to_string(),
        JsValue::Number(n) => format_number(*n),
        JsValue::String(s) => s.clone(),
        JsValue::Array(items) => items
            .iter()
            .map(|item| {
                if item.is_nullish() {
                    String::new()
                } else {
                    str_val(item)
                }
            })
            .collect::<Vec<_>>()
            .join(","),
        JsValue::Object(_) => "[object Object]".to_string(),
        JsValue::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
    }
}

// ----------------------------------------------------------------- Comparison

/// `==` in both expression languages is strict: no type coercion.
pub fn strict_equals(a: &JsValue, b: &JsValue) -> bool {
    a == b
}

/// Relational ordering: numeric for numbers, lexicographic for two strings,
/// numeric coercion otherwise. `None` when either side is NaN.
pub fn compare(a: &JsValue, b: &JsValue) -> Option<Ordering> {
    match (a, b) {
        (JsValue::String(x), JsValue::String(y)) => Some(x.cmp(y)),
        _ => num(a).partial_cmp(&num(b)),
    }
}

pub fn js_lt(a: &JsValue, b: &JsValue) -> bool {
    compare(a, b) == Some(Ordering::Less)
}

pub fn js_gt(a: &JsValue, b: &JsValue) -> bool {
    compare(a, b) == Some(Ordering::Greater)
}

pub fn js_lte(a: &JsValue, b: &JsValue) -> bool {
    matches!(compare(a, b), Some(Ordering::Less | Ordering::Equal))
}

pub fn js_gte(a: &JsValue, b: &JsValue) -> bool {
    matches!(compare(a, b), Some(Ordering::Greater | Ordering::Equal))
}

// ----------------------------------------------------------------- Containers

/// Resolves a relative index the way `slice()` does: negatives count from the
/// end, everything is clamped into `0..=len`.
pub fn normalize_slice_index(idx: i64, len: usize) -> usize {
    let len = len as i64;
    if idx < 0 {
        (len + idx).max(0) as usize
    } else {
        idx.min(len) as usize
    }
}

/// Property lookup shared by `.prop`, `[key]` and path segments. Missing keys
/// yield `undefined`; the caller handles null/undefined receivers.
pub fn get_property(container: &JsValue, key: &str) -> JsValue {
    match container {
        JsValue::Object(map) => map.get(key).cloned().unwrap_or_default(),
        JsValue::Array(items) => {
            if key == "length" {
                return JsValue::from(items.len());
            }
            key.parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or_default()
        }
        JsValue::String(s) => {
            if key == "length" {
                return JsValue::from(s.chars().count());
            }
            key.parse::<usize>()
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| JsValue::String(c.to_string()))
                .unwrap_or_default()
        }
        _ => JsValue::Undefined,
    }
}

/// `container[index]` once the index has been evaluated.
pub fn get_index(container: &JsValue, index: &JsValue) -> JsValue {
    match (container, index) {
        (JsValue::Array(items), JsValue::Number(n)) => {
            if n.fract() != 0.0 || *n < 0.0 {
                return JsValue::Undefined;
            }
            items.get(*n as usize).cloned().unwrap_or_default()
        }
        (JsValue::String(s), JsValue::Number(n)) => {
            if n.fract() != 0.0 || *n < 0.0 {
                return JsValue::Undefined;
            }
            s.chars()
                .nth(*n as usize)
                .map(|c| JsValue::String(c.to_string()))
                .unwrap_or_default()
        }
        _ => get_property(container, &str_val(index)),
    }
}
