use crate::error::ExprError;
use crate::expression::Expression;
use crate::scope::Scope;
use crate::types::JsValue;

/// Evaluates structural expressions. Array operations call back into this to
/// resolve their source arrays and lambda bodies.
pub trait ExpressionEvaluator {
    fn evaluate_expression(&self, expr: &Expression, scope: &Scope<'_>) -> Result<JsValue, ExprError>;
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&Expression, &Scope<'_>) -> Result<JsValue, ExprError>,
{
    fn evaluate_expression(&self, expr: &Expression, scope: &Scope<'_>) -> Result<JsValue, ExprError> {
        self(expr, scope)
    }
}

/// The context passed to every array operation: the scope to evaluate in and
/// the evaluator to delegate sub-expressions to.
#[derive(Clone, Copy)]
pub struct ArrayEvalCtx<'a> {
    pub scope: &'a Scope<'a>,
    pub evaluator: &'a dyn ExpressionEvaluator,
}

impl<'a> ArrayEvalCtx<'a> {
    pub fn new(scope: &'a Scope<'a>, evaluator: &'a dyn ExpressionEvaluator) -> Self {
        ArrayEvalCtx { scope, evaluator }
    }

    pub fn evaluate_expression(&self, expr: &Expression) -> Result<JsValue, ExprError> {
        self.evaluator.evaluate_expression(expr, self.scope)
    }
}
