//! Document-level evaluation of structural expressions.

use crate::array_ops::evaluate_array_operation;
use crate::ast::BinaryOp;
use crate::builtins;
use crate::error::ExprError;
use crate::eval_ctx::{ArrayEvalCtx, ExpressionEvaluator};
use crate::expression::{Expression, TemplatePart};
use crate::interpreter::{apply_binary, apply_unary};
use crate::scope::Scope;
use crate::types::{BuiltinMap, Callable, JsValue};
use crate::util;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Evaluates [`Expression`] trees against a [`Scope`]. Calls resolve to
/// registered functions first, then built-ins.
#[derive(Clone)]
pub struct DocumentEvaluator {
    functions: HashMap<String, Callable>,
    builtins: Arc<BuiltinMap>,
}

impl Default for DocumentEvaluator {
    fn default() -> Self {
        DocumentEvaluator {
            functions: HashMap::new(),
            builtins: builtins::shared_builtins(),
        }
    }
}

impl DocumentEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_function<F>(&mut self, name: &str, func: F) -> Result<(), ExprError>
    where
        F: Fn(&[JsValue]) -> Result<JsValue, ExprError> + Send + Sync + 'static,
    {
        if self.builtins.contains_key(name) {
            return Err(ExprError::BuiltinOverride(name.to_string()));
        }
        util::check_access(name)?;
        tracing::trace!(name, "registered document function");
        self.functions
            .insert(name.to_string(), Callable::new(name, func));
        Ok(())
    }

    pub fn evaluate(&self, expr: &Expression, scope: &Scope<'_>) -> Result<JsValue, ExprError> {
        match expr {
            Expression::Literal(value) => Ok(JsValue::from(value)),
            Expression::Path(path) => scope.resolve_path(path),
            Expression::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(expr) => {
                            let value = self.evaluate(expr, scope)?;
                            if !value.is_nullish() {
                                out.push_str(&util::str_val(&value));
                            }
                        }
                    }
                }
                Ok(JsValue::String(out))
            }
            Expression::Array(items) => items
                .iter()
                .map(|item| self.evaluate(item, scope))
                .collect::<Result<Vec<_>, _>>()
                .map(JsValue::Array),
            Expression::Object(fields) => fields
                .iter()
                .map(|(key, value)| Ok((key.clone(), self.evaluate(value, scope)?)))
                .collect::<Result<BTreeMap<_, _>, ExprError>>()
                .map(JsValue::Object),
            Expression::Binary {
                op: BinaryOp::Coalesce,
                left,
                right,
            } => {
                let left = self.evaluate(left, scope)?;
                if left.is_nullish() {
                    self.evaluate(right, scope)
                } else {
                    Ok(left)
                }
            }
            Expression::Binary { op, left, right } => {
                let left = self.evaluate(left, scope)?;
                let right = self.evaluate(right, scope)?;
                Ok(apply_binary(*op, left, right))
            }
            Expression::Unary { op, operand } => Ok(apply_unary(*op, &self.evaluate(operand, scope)?)),
            Expression::Call { function, args } => self.call(function, args, scope),
            Expression::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if util::is_truthy(&self.evaluate(condition, scope)?) {
                    self.evaluate(then, scope)
                } else {
                    match otherwise {
                        Some(otherwise) => self.evaluate(otherwise, scope),
                        None => Ok(JsValue::Undefined),
                    }
                }
            }
            Expression::Switch {
                subject,
                cases,
                default,
            } => {
                let key = util::str_val(&self.evaluate(subject, scope)?);
                match (cases.get(&key), default) {
                    (Some(case), _) => self.evaluate(case, scope),
                    (None, Some(default)) => self.evaluate(default, scope),
                    (None, None) => Ok(JsValue::Undefined),
                }
            }
            Expression::Coalesce(candidates) => {
                let mut last = JsValue::Undefined;
                for candidate in candidates {
                    last = self.evaluate(candidate, scope)?;
                    if !last.is_nullish() {
                        break;
                    }
                }
                Ok(last)
            }
            Expression::ArrayOp(op) => evaluate_array_operation(op, &ArrayEvalCtx::new(scope, self)),
        }
    }

    fn call(&self, function: &str, args: &[Expression], scope: &Scope<'_>) -> Result<JsValue, ExprError> {
        util::check_access(function)?;
        let args = args
            .iter()
            .map(|arg| self.evaluate(arg, scope))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(func) = self.functions.get(function) {
            return func.call(&args);
        }
        if let Some(JsValue::Function(func)) = scope.get(function) {
            return func.call(&args);
        }
        match self.builtins.get(function) {
            Some(def) => def.invoke(&args),
            None => Err(ExprError::UnknownFunction(function.to_string())),
        }
    }
}

impl ExpressionEvaluator for DocumentEvaluator {
    fn evaluate_expression(&self, expr: &Expression, scope: &Scope<'_>) -> Result<JsValue, ExprError> {
        self.evaluate(expr, scope)
    }
}
