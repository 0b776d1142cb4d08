//! Built-in functions available to string expressions and `{call}` nodes.
//!
//! Each family module exposes `builtins()`, returning its definitions. Names
//! here can never be overridden by `register_function`.

pub mod arithmetic;
pub mod array;
pub mod conversion;
pub mod string;
pub mod type_ops;

use crate::error::ExprError;
use crate::types::{builtins_to_map, BuiltinDefinition, BuiltinMap, Callable, JsValue};
use std::sync::{Arc, OnceLock};

pub fn all_builtins() -> Vec<Arc<BuiltinDefinition>> {
    let mut defs = Vec::new();
    defs.extend(arithmetic::builtins());
    defs.extend(string::builtins());
    defs.extend(conversion::builtins());
    defs.extend(type_ops::builtins());
    defs.extend(array::builtins());
    defs
}

pub fn builtins_map() -> BuiltinMap {
    builtins_to_map(all_builtins())
}

/// Process-wide built-in table, built on first use.
pub fn shared_builtins() -> Arc<BuiltinMap> {
    static SHARED: OnceLock<Arc<BuiltinMap>> = OnceLock::new();
    Arc::clone(SHARED.get_or_init(|| Arc::new(builtins_map())))
}

pub fn is_builtin(name: &str) -> bool {
    shared_builtins().contains_key(name)
}

// ----------------------------------------------------------------- Arguments

static UNDEFINED: JsValue = JsValue::Undefined;

/// Positional argument; missing arguments read as `undefined`.
pub(crate) fn arg(args: &[JsValue], index: usize) -> &JsValue {
    args.get(index).unwrap_or(&UNDEFINED)
}

pub(crate) fn require_array<'a>(name: &str, value: &'a JsValue) -> Result<&'a Vec<JsValue>, ExprError> {
    value
        .as_array()
        .ok_or_else(|| ExprError::type_error(format!("{} requires an array", name)))
}

pub(crate) fn require_function<'a>(name: &str, value: &'a JsValue) -> Result<&'a Callable, ExprError> {
    match value {
        JsValue::Function(f) => Ok(f),
        _ => Err(ExprError::type_error(format!("{} requires a function", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let defs = all_builtins();
        assert_eq!(defs.len(), builtins_map().len());
    }

    #[test]
    fn test_families_registered() {
        for name in ["abs", "concat", "parseInt", "isArray", "flatMap", "unshift"] {
            assert!(is_builtin(name), "{} missing", name);
        }
        assert!(!is_builtin("eval"));
    }
}
