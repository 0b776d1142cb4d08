//! String built-ins. Indices count characters, not bytes. `length`,
//! `includes`, `indexOf`, `lastIndexOf` and `slice` also accept arrays.

use super::arg;
use crate::error::ExprError;
use crate::types::{Arity, BuiltinDefinition, JsValue};
use crate::util;
use std::sync::Arc;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

/// Converts a byte offset returned by `str::find` into a character index.
fn char_index(s: &str, byte: usize) -> usize {
    s[..byte].chars().count()
}

fn concat_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::String(args.iter().map(util::str_val).collect()))
}

/// `substring` clamps negatives to zero and swaps reversed bounds.
fn substring_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let s = util::str_val(arg(args, 0));
    let len = char_len(&s) as i64;
    let clamp = |v: &JsValue| util::int(v).clamp(0, len) as usize;
    let start = clamp(arg(args, 1));
    let end = match arg(args, 2) {
        JsValue::Undefined => len as usize,
        v => clamp(v),
    };
    let (start, end) = if start > end { (end, start) } else { (start, end) };
    Ok(JsValue::String(char_slice(&s, start, end)))
}

fn to_lower_case_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::String(util::str_val(arg(args, 0)).to_lowercase()))
}

fn to_upper_case_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::String(util::str_val(arg(args, 0)).to_uppercase()))
}

fn trim_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    Ok(JsValue::String(util::str_val(arg(args, 0)).trim().to_string()))
}

fn split_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let s = util::str_val(arg(args, 0));
    let parts: Vec<JsValue> = match arg(args, 1) {
        JsValue::Undefined => vec![JsValue::String(s)],
        separator => {
            let separator = util::str_val(separator);
            if separator.is_empty() {
                s.chars().map(|c| JsValue::String(c.to_string())).collect()
            } else {
                s.split(separator.as_str()).map(JsValue::from).collect()
            }
        }
    };
    Ok(JsValue::Array(parts))
}

fn join_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let items = super::require_array("join", arg(args, 0))?;
    let separator = match arg(args, 1) {
        JsValue::Undefined => ",".to_string(),
        v => util::str_val(v),
    };
    let joined = items
        .iter()
        .map(|item| {
            if item.is_nullish() {
                String::new()
            } else {
                util::str_val(item)
            }
        })
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(JsValue::String(joined))
}

fn replace_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let s = util::str_val(arg(args, 0));
    let pattern = util::str_val(arg(args, 1));
    let replacement = util::str_val(arg(args, 2));
    Ok(JsValue::String(s.replacen(&pattern, &replacement, 1)))
}

fn replace_all_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let s = util::str_val(arg(args, 0));
    let pattern = util::str_val(arg(args, 1));
    let replacement = util::str_val(arg(args, 2));
    Ok(JsValue::String(s.replace(&pattern, &replacement)))
}

fn length_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let len = match arg(args, 0) {
        JsValue::Array(items) => items.len(),
        JsValue::Object(map) => map.len(),
        v if v.is_nullish() => 0,
        v => char_len(&util::str_val(v)),
    };
    Ok(JsValue::from(len))
}

fn starts_with_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let s = util::str_val(arg(args, 0));
    Ok(JsValue::Bool(s.starts_with(&util::str_val(arg(args, 1)))))
}

fn ends_with_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let s = util::str_val(arg(args, 0));
    Ok(JsValue::Bool(s.ends_with(&util::str_val(arg(args, 1)))))
}

fn includes_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let needle = arg(args, 1);
    let found = match arg(args, 0) {
        JsValue::Array(items) => items.iter().any(|item| util::strict_equals(item, needle)),
        haystack => util::str_val(haystack).contains(&util::str_val(needle)),
    };
    Ok(JsValue::Bool(found))
}

fn index_of_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let needle = arg(args, 1);
    let index = match arg(args, 0) {
        JsValue::Array(items) => items.iter().position(|item| util::strict_equals(item, needle)),
        haystack => {
            let s = util::str_val(haystack);
            s.find(&util::str_val(needle)).map(|byte| char_index(&s, byte))
        }
    };
    Ok(JsValue::Number(index.map_or(-1.0, |i| i as f64)))
}

fn last_index_of_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let needle = arg(args, 1);
    let index = match arg(args, 0) {
        JsValue::Array(items) => items.iter().rposition(|item| util::strict_equals(item, needle)),
        haystack => {
            let s = util::str_val(haystack);
            s.rfind(&util::str_val(needle)).map(|byte| char_index(&s, byte))
        }
    };
    Ok(JsValue::Number(index.map_or(-1.0, |i| i as f64)))
}

/// `slice(value, start?, end?)` on strings or arrays, negatives counting from
/// the end.
fn slice_eval(args: &[JsValue]) -> Result<JsValue, ExprError> {
    let target = arg(args, 0);
    let len = match target {
        JsValue::Array(items) => items.len(),
        v => char_len(&util::str_val(v)),
    };
    let start = util::normalize_slice_index(util::int(arg(args, 1)), len);
    let end = match arg(args, 2) {
        JsValue::Undefined => len,
        v => util::normalize_slice_index(util::int(v), len),
    };
    Ok(match target {
        JsValue::Array(items) if start < end => JsValue::Array(items[start..end].to_vec()),
        JsValue::Array(_) => JsValue::Array(Vec::new()),
        v => JsValue::String(char_slice(&util::str_val(v), start, end)),
    })
}

pub fn builtins() -> Vec<Arc<BuiltinDefinition>> {
    vec![
        Arc::new(BuiltinDefinition {
            name: "concat",
            arity: Arity::Any,
            eval_fn: concat_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "substring",
            arity: Arity::Range(2, Some(3)),
            eval_fn: substring_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "toLowerCase",
            arity: Arity::Fixed(1),
            eval_fn: to_lower_case_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "toUpperCase",
            arity: Arity::Fixed(1),
            eval_fn: to_upper_case_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "trim",
            arity: Arity::Fixed(1),
            eval_fn: trim_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "split",
            arity: Arity::Range(1, Some(2)),
            eval_fn: split_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "join",
            arity: Arity::Range(1, Some(2)),
            eval_fn: join_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "replace",
            arity: Arity::Fixed(3),
            eval_fn: replace_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "replaceAll",
            arity: Arity::Fixed(3),
            eval_fn: replace_all_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "length",
            arity: Arity::Fixed(1),
            eval_fn: length_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "startsWith",
            arity: Arity::Fixed(2),
            eval_fn: starts_with_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "endsWith",
            arity: Arity::Fixed(2),
            eval_fn: ends_with_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "includes",
            arity: Arity::Fixed(2),
            eval_fn: includes_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "indexOf",
            arity: Arity::Fixed(2),
            eval_fn: index_of_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "lastIndexOf",
            arity: Arity::Fixed(2),
            eval_fn: last_index_of_eval,
        }),
        Arc::new(BuiltinDefinition {
            name: "slice",
            arity: Arity::Range(1, Some(3)),
            eval_fn: slice_eval,
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> JsValue {
        JsValue::from(v)
    }

    #[test]
    fn test_substring_swaps_and_clamps() {
        assert_eq!(
            substring_eval(&[s("hello"), JsValue::from(4.0), JsValue::from(1.0)]).unwrap(),
            s("ell")
        );
        assert_eq!(
            substring_eval(&[s("hello"), JsValue::from(-3.0)]).unwrap(),
            s("hello")
        );
    }

    #[test]
    fn test_slice_negative_start() {
        assert_eq!(slice_eval(&[s("hello"), JsValue::from(-3.0)]).unwrap(), s("llo"));
        assert_eq!(
            slice_eval(&[s("hello"), JsValue::from(3.0), JsValue::from(1.0)]).unwrap(),
            s("")
        );
    }

    #[test]
    fn test_index_of_counts_chars() {
        assert_eq!(
            index_of_eval(&[s("héllo"), s("l")]).unwrap(),
            JsValue::from(2.0)
        );
        assert_eq!(
            last_index_of_eval(&[s("hello"), s("x")]).unwrap(),
            JsValue::from(-1.0)
        );
    }

    #[test]
    fn test_split_and_join() {
        assert_eq!(
            split_eval(&[s("a,b,,c"), s(",")]).unwrap(),
            JsValue::Array(vec![s("a"), s("b"), s(""), s("c")])
        );
        assert_eq!(
            split_eval(&[s("ab"), s("")]).unwrap(),
            JsValue::Array(vec![s("a"), s("b")])
        );
        let items = JsValue::Array(vec![JsValue::from(1.0), JsValue::Null, s("x")]);
        assert_eq!(join_eval(&[items.clone()]).unwrap(), s("1,,x"));
        assert_eq!(join_eval(&[items, s("-")]).unwrap(), s("1--x"));
        assert!(join_eval(&[s("abc")]).is_err());
    }
}
