use crate::error::ExprError;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Signature shared by custom functions and function values.
pub type NativeFn = dyn Fn(&[JsValue]) -> Result<JsValue, ExprError> + Send + Sync;

/// A named function value. Identifiers that resolve to a function evaluate to
/// one of these, so functions can be passed to `map`, `filter` and friends.
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    func: Arc<NativeFn>,
}

impl Callable {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[JsValue]) -> Result<JsValue, ExprError> + Send + Sync + 'static,
    {
        Callable {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[JsValue]) -> Result<JsValue, ExprError> {
        (self.func)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", self.name)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

/// A runtime value. Numbers are IEEE-754 doubles; `Undefined` is kept
/// distinct from `Null` because `??`, `isUndefined` and variable lookup all
/// observe the difference.
#[derive(Debug, Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<JsValue>),
    Object(BTreeMap<String, JsValue>),
    Function(Callable),
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Bool(a), JsValue::Bool(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Array(a), JsValue::Array(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => a == b,
            (JsValue::Function(a), JsValue::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl JsValue {
    /// The `typeof`-style name reported alongside evaluation results.
    pub fn type_name(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "null",
            JsValue::Bool(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Array(_) => "array",
            JsValue::Object(_) => "object",
            JsValue::Function(_) => "function",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Null | JsValue::Undefined)
    }

    pub fn as_array(&self) -> Option<&Vec<JsValue>> {
        match self {
            JsValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Converts into JSON. `undefined` and functions become `null`, as do
    /// non-finite numbers.
    pub fn to_json(&self) -> Value {
        match self {
            JsValue::Undefined | JsValue::Null | JsValue::Function(_) => Value::Null,
            JsValue::Bool(b) => Value::Bool(*b),
            JsValue::Number(n) => number_to_json(*n),
            JsValue::String(s) => Value::String(s.clone()),
            JsValue::Array(items) => Value::Array(items.iter().map(JsValue::to_json).collect()),
            JsValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return Value::Number(serde_json::Number::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

impl From<Value> for JsValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => JsValue::Null,
            Value::Bool(b) => JsValue::Bool(b),
            Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => JsValue::String(s),
            Value::Array(items) => JsValue::Array(items.into_iter().map(JsValue::from).collect()),
            Value::Object(map) => {
                JsValue::Object(map.into_iter().map(|(k, v)| (k, JsValue::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for JsValue {
    fn from(v: &Value) -> Self {
        JsValue::from(v.clone())
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Bool(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i64> for JsValue {
    fn from(n: i64) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<usize> for JsValue {
    fn from(n: usize) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(s)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(s.to_string())
    }
}

impl From<Vec<JsValue>> for JsValue {
    fn from(items: Vec<JsValue>) -> Self {
        JsValue::Array(items)
    }
}

impl From<Callable> for JsValue {
    fn from(f: Callable) -> Self {
        JsValue::Function(f)
    }
}

/// Built-in arity.
#[derive(Debug, Clone, PartialEq)]
pub enum Arity {
    /// No check.
    Any,
    /// Exactly `n` arguments.
    Fixed(usize),
    /// Between `min` and `max` arguments. `None` for no upper bound.
    Range(usize, Option<usize>),
}

impl Arity {
    /// Upper bound on accepted arguments, if any.
    pub fn max_args(&self) -> Option<usize> {
        match self {
            Arity::Any => None,
            Arity::Fixed(n) => Some(*n),
            Arity::Range(_, max) => *max,
        }
    }
}

/// Plain function pointer backing a built-in.
pub type BuiltinFn = fn(&[JsValue]) -> Result<JsValue, ExprError>;

pub struct BuiltinDefinition {
    pub name: &'static str,
    pub arity: Arity,
    pub eval_fn: BuiltinFn,
}

/// Map of built-in name -> definition.
pub type BuiltinMap = HashMap<String, Arc<BuiltinDefinition>>;

pub fn assert_arity(name: &str, arity: &Arity, argc: usize) -> Result<(), ExprError> {
    match arity {
        Arity::Any => Ok(()),
        Arity::Fixed(n) => {
            if argc != *n {
                Err(ExprError::type_error(format!(
                    "\"{}\" expects {} arguments, got {}",
                    name, n, argc
                )))
            } else {
                Ok(())
            }
        }
        Arity::Range(min, max) => {
            if argc < *min {
                return Err(ExprError::type_error(format!(
                    "\"{}\" expects at least {} arguments, got {}",
                    name, min, argc
                )));
            }
            match max {
                Some(max) if argc > *max => Err(ExprError::type_error(format!(
                    "\"{}\" expects at most {} arguments, got {}",
                    name, max, argc
                ))),
                _ => Ok(()),
            }
        }
    }
}

impl BuiltinDefinition {
    pub fn invoke(&self, args: &[JsValue]) -> Result<JsValue, ExprError> {
        assert_arity(self.name, &self.arity, args.len())?;
        (self.eval_fn)(args)
    }
}

pub fn builtins_to_map(builtins: Vec<Arc<BuiltinDefinition>>) -> BuiltinMap {
    builtins
        .into_iter()
        .map(|def| (def.name.to_string(), def))
        .collect()
}

/// Wraps a built-in as a function value. Surplus arguments are dropped, so
/// `map(xs, toString)` works even though callbacks receive `(el, idx, arr)`.
pub fn builtin_callable(def: &Arc<BuiltinDefinition>) -> Callable {
    let def = Arc::clone(def);
    Callable::new(def.name, move |args: &[JsValue]| {
        let argc = def
            .arity
            .max_args()
            .map_or(args.len(), |max| max.min(args.len()));
        def.invoke(&args[..argc])
    })
}
