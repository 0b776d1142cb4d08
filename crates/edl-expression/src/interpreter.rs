//! Sandboxed tree-walking interpreter for string expressions.
//!
//! ```
//! use edl_expression::{JsValue, SafeEvaluator};
//!
//! let evaluator = SafeEvaluator::new().with_variables([("price", 2.5), ("qty", 4.0)]);
//! let result = evaluator.evaluate("price * qty > 5 ? 'large' : 'small'");
//! assert_eq!(result.value, JsValue::from("large"));
//! ```

use crate::ast::{BinaryOp, Node, UnaryOp};
use crate::builtins;
use crate::error::ExprError;
use crate::lexer::Lexer;
use crate::options::EvaluatorOptions;
use crate::parser::Parser;
use crate::types::{builtin_callable, BuiltinMap, Callable, JsValue};
use crate::util;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ----------------------------------------------------------------- Operators

/// Binary operator semantics shared with the structural evaluator. `&&` and
/// `||` yield one of their operands rather than a boolean. Both operands have
/// already been evaluated by the time this runs.
pub fn apply_binary(op: BinaryOp, left: JsValue, right: JsValue) -> JsValue {
    match op {
        BinaryOp::Add => match (&left, &right) {
            (JsValue::String(_) | JsValue::Array(_) | JsValue::Object(_), _)
            | (_, JsValue::String(_) | JsValue::Array(_) | JsValue::Object(_)) => {
                JsValue::String(util::str_val(&left) + &util::str_val(&right))
            }
            _ => JsValue::Number(util::num(&left) + util::num(&right)),
        },
        BinaryOp::Sub => JsValue::Number(util::num(&left) - util::num(&right)),
        BinaryOp::Mul => JsValue::Number(util::num(&left) * util::num(&right)),
        BinaryOp::Div => JsValue::Number(util::num(&left) / util::num(&right)),
        BinaryOp::Mod => JsValue::Number(util::num(&left) % util::num(&right)),
        BinaryOp::Eq => JsValue::Bool(util::strict_equals(&left, &right)),
        BinaryOp::NotEq => JsValue::Bool(!util::strict_equals(&left, &right)),
        BinaryOp::Lt => JsValue::Bool(util::js_lt(&left, &right)),
        BinaryOp::Gt => JsValue::Bool(util::js_gt(&left, &right)),
        BinaryOp::LtEq => JsValue::Bool(util::js_lte(&left, &right)),
        BinaryOp::GtEq => JsValue::Bool(util::js_gte(&left, &right)),
        BinaryOp::And => {
            if util::is_truthy(&left) {
                right
            } else {
                left
            }
        }
        BinaryOp::Or => {
            if util::is_truthy(&left) {
                left
            } else {
                right
            }
        }
        BinaryOp::Coalesce => {
            if left.is_nullish() {
                right
            } else {
                left
            }
        }
    }
}

pub fn apply_unary(op: UnaryOp, operand: &JsValue) -> JsValue {
    match op {
        UnaryOp::Not => JsValue::Bool(!util::is_truthy(operand)),
        UnaryOp::Neg => JsValue::Number(-util::num(operand)),
    }
}

// ----------------------------------------------------------------- Results

/// Outcome of [`SafeEvaluator::evaluate`]. On failure `value` is `undefined`
/// and `error` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionResult {
    pub value: JsValue,
    pub value_type: &'static str,
    pub error: Option<ExprError>,
}

impl ExpressionResult {
    fn ok(value: JsValue) -> Self {
        ExpressionResult {
            value_type: value.type_name(),
            value,
            error: None,
        }
    }

    fn err(error: ExprError) -> Self {
        ExpressionResult {
            value: JsValue::Undefined,
            value_type: JsValue::Undefined.type_name(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    pub fn into_result(self) -> Result<JsValue, ExprError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.value),
        }
    }
}

// ----------------------------------------------------------------- State

/// Per-call bookkeeping. Lives on the caller's stack so one evaluator can
/// serve concurrent calls.
struct EvalState {
    depth: usize,
    max_depth: usize,
    started: Instant,
    timeout: Duration,
}

impl EvalState {
    fn new(options: &EvaluatorOptions) -> Self {
        EvalState {
            depth: 0,
            max_depth: options.max_depth,
            started: Instant::now(),
            timeout: options.timeout(),
        }
    }

    fn check_timeout(&self) -> Result<(), ExprError> {
        if self.started.elapsed() > self.timeout {
            return Err(ExprError::Timeout(self.timeout.as_millis() as u64));
        }
        Ok(())
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.check_timeout()?;
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ExprError::DepthExceeded(self.max_depth));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------- Evaluator

/// Evaluates string expressions against variables, registered functions and
/// the built-in library.
#[derive(Clone)]
pub struct SafeEvaluator {
    variables: HashMap<String, JsValue>,
    functions: HashMap<String, Callable>,
    builtins: Arc<BuiltinMap>,
    options: EvaluatorOptions,
}

impl Default for SafeEvaluator {
    fn default() -> Self {
        Self::with_options(EvaluatorOptions::default())
    }
}

impl fmt::Debug for SafeEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<&String> = self.functions.keys().collect();
        functions.sort();
        f.debug_struct("SafeEvaluator")
            .field("variables", &self.variables)
            .field("functions", &functions)
            .field("options", &self.options)
            .finish()
    }
}

impl SafeEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: EvaluatorOptions) -> Self {
        SafeEvaluator {
            variables: HashMap::new(),
            functions: HashMap::new(),
            builtins: builtins::shared_builtins(),
            options,
        }
    }

    pub fn with_variables<I, K, V>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<JsValue>,
    {
        for (name, value) in variables {
            self.variables.insert(name.into(), value.into());
        }
        self
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<JsValue>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&JsValue> {
        self.variables.get(name)
    }

    /// Registers a custom function. Built-in names and sandboxed names are
    /// refused; re-registering a custom name replaces it.
    pub fn register_function<F>(&mut self, name: &str, func: F) -> Result<(), ExprError>
    where
        F: Fn(&[JsValue]) -> Result<JsValue, ExprError> + Send + Sync + 'static,
    {
        if self.builtins.contains_key(name) {
            return Err(ExprError::BuiltinOverride(name.to_string()));
        }
        util::check_access(name)?;
        tracing::trace!(name, "registered custom function");
        self.functions
            .insert(name.to_string(), Callable::new(name, func));
        Ok(())
    }

    /// Parses and evaluates `expression`. Errors are reported in the result,
    /// never returned.
    #[tracing::instrument(level = "debug", skip(self, expression), fields(len = expression.len()))]
    pub fn evaluate(&self, expression: &str) -> ExpressionResult {
        match self.try_evaluate(expression) {
            Ok(value) => ExpressionResult::ok(value),
            Err(error) => {
                tracing::debug!(%error, kind = ?error.kind(), "evaluation failed");
                ExpressionResult::err(error)
            }
        }
    }

    /// The timeout budget covers tokenizing and parsing as well.
    pub fn try_evaluate(&self, expression: &str) -> Result<JsValue, ExprError> {
        let mut state = EvalState::new(&self.options);
        let tokens = Lexer::tokenize(expression)?;
        let ast = Parser::parse_with_limit(tokens, self.options.max_depth)?;
        self.eval(&ast, &mut state)
    }

    /// Evaluates an already parsed tree with a fresh depth counter and clock.
    pub fn evaluate_node(&self, node: &Node) -> Result<JsValue, ExprError> {
        let mut state = EvalState::new(&self.options);
        self.eval(node, &mut state)
    }

    fn eval(&self, node: &Node, state: &mut EvalState) -> Result<JsValue, ExprError> {
        state.enter()?;
        let result = self.eval_inner(node, state);
        state.depth -= 1;
        result
    }

    fn eval_inner(&self, node: &Node, state: &mut EvalState) -> Result<JsValue, ExprError> {
        match node {
            Node::Literal(value) => Ok(value.clone()),
            Node::Identifier(name) => self.resolve_identifier(name),
            Node::Binary {
                op: BinaryOp::Coalesce,
                left,
                right,
            } => {
                let left = self.eval(left, state)?;
                if left.is_nullish() {
                    self.eval(right, state)
                } else {
                    Ok(left)
                }
            }
            // `&&` and `||` deliberately evaluate both sides.
            Node::Binary { op, left, right } => {
                let left = self.eval(left, state)?;
                let right = self.eval(right, state)?;
                Ok(apply_binary(*op, left, right))
            }
            Node::Unary { op, operand } => Ok(apply_unary(*op, &self.eval(operand, state)?)),
            Node::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if util::is_truthy(&self.eval(test, state)?) {
                    self.eval(consequent, state)
                } else {
                    self.eval(alternate, state)
                }
            }
            Node::Member { object, property } => {
                util::check_access(property)?;
                let object = self.eval(object, state)?;
                if object.is_nullish() {
                    return Err(ExprError::type_error(format!(
                        "Cannot access property '{}' of {}",
                        property,
                        object.type_name()
                    )));
                }
                Ok(util::get_property(&object, property))
            }
            Node::Index { object, index } => {
                let object = self.eval(object, state)?;
                let index = self.eval(index, state)?;
                // Anything but a number is looked up by its string form.
                if !matches!(index, JsValue::Number(_)) {
                    util::check_access(&util::str_val(&index))?;
                }
                if object.is_nullish() {
                    return Err(ExprError::type_error(format!(
                        "Cannot access index {} of {}",
                        util::str_val(&index),
                        object.type_name()
                    )));
                }
                Ok(util::get_index(&object, &index))
            }
            Node::Call { name, args } => self.call_function(name, args, state),
        }
    }

    /// Variables first, then custom functions, then built-ins. Functions
    /// resolve to callable values so they can be passed to `map` and friends.
    fn resolve_identifier(&self, name: &str) -> Result<JsValue, ExprError> {
        util::check_access(name)?;
        if let Some(value) = self.variables.get(name) {
            return Ok(value.clone());
        }
        if let Some(func) = self.functions.get(name) {
            return Ok(JsValue::Function(func.clone()));
        }
        if let Some(def) = self.builtins.get(name) {
            return Ok(JsValue::Function(builtin_callable(def)));
        }
        Err(ExprError::UndefinedVariable(name.to_string()))
    }

    fn call_function(
        &self,
        name: &str,
        args: &[Node],
        state: &mut EvalState,
    ) -> Result<JsValue, ExprError> {
        util::check_access(name)?;
        let args = args
            .iter()
            .map(|arg| self.eval(arg, state))
            .collect::<Result<Vec<_>, _>>()?;

        let result = if let Some(JsValue::Function(func)) = self.variables.get(name) {
            func.call(&args)?
        } else if let Some(func) = self.functions.get(name) {
            func.call(&args)?
        } else if let Some(def) = self.builtins.get(name) {
            def.invoke(&args)?
        } else {
            return Err(ExprError::UndefinedFunction(name.to_string()));
        };
        // Host functions can take arbitrarily long.
        state.check_timeout()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expression: &str) -> JsValue {
        SafeEvaluator::new()
            .try_evaluate(expression)
            .unwrap_or_else(|e| panic!("evaluate({}) failed: {}", expression, e))
    }

    #[test]
    fn test_evaluator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SafeEvaluator>();
    }

    #[test]
    fn test_plus_concatenates_strings() {
        assert_eq!(eval("'a' + 1"), JsValue::from("a1"));
        assert_eq!(eval("1 + '1'"), JsValue::from("11"));
        assert_eq!(eval("true + 1"), JsValue::from(2.0));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(eval("0 || 'fallback'"), JsValue::from("fallback"));
        assert_eq!(eval("'x' && 5"), JsValue::from(5.0));
        assert_eq!(eval("null && 5"), JsValue::Null);
    }

    #[test]
    fn test_depth_counter_resets_between_calls() {
        let evaluator = SafeEvaluator::with_options(EvaluatorOptions::default().with_max_depth(8));
        for _ in 0..3 {
            assert_eq!(evaluator.try_evaluate("(1 + 2) * 3").unwrap(), JsValue::from(9.0));
        }
    }

    #[test]
    fn test_result_carries_type() {
        let evaluator = SafeEvaluator::new();
        let result = evaluator.evaluate("[1]");
        assert!(!result.is_ok());
        assert_eq!(result.value_type, "undefined");
        assert_eq!(evaluator.evaluate("'s'").value_type, "string");
        assert_eq!(evaluator.evaluate("abs").value_type, "function");
    }
}
