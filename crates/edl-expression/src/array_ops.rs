//! Array operations over structural expressions.
//!
//! ```yaml
//! op: filter
//! array: $orders
//! predicate:
//!   param: order
//!   body: { op: ">", left: $order.amount, right: 0 }
//! ```
//!
//! Lambdas run in a child scope of the caller's scope; the parent is never
//! modified.

use crate::error::ExprError;
use crate::eval_ctx::ArrayEvalCtx;
use crate::expression::{parse_expression, Expression};
use crate::types::JsValue;
use crate::util;
use serde_json::{Map, Value};

pub const ARRAY_OPERATIONS: &[&str] = &["map", "filter", "reduce", "slice", "flatMap"];

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaParams {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: LambdaParams,
    pub body: Expression,
}

impl Lambda {
    pub fn single(param: impl Into<String>, body: Expression) -> Self {
        Lambda {
            params: LambdaParams::Single(param.into()),
            body,
        }
    }

    pub fn multiple<I, S>(params: I, body: Expression) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Lambda {
            params: LambdaParams::Multiple(params.into_iter().map(Into::into).collect()),
            body,
        }
    }

    fn param_count(&self) -> usize {
        match &self.params {
            LambdaParams::Single(_) => 1,
            LambdaParams::Multiple(names) => names.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayOperation {
    Map {
        array: Expression,
        transform: Lambda,
    },
    Filter {
        array: Expression,
        predicate: Lambda,
    },
    Reduce {
        array: Expression,
        reducer: Lambda,
        initial: Expression,
    },
    Slice {
        array: Expression,
        start: i64,
        end: Option<i64>,
        step: Option<i64>,
        /// Document path of the operation, for errors raised while slicing.
        path: String,
    },
    FlatMap {
        array: Expression,
        transform: Lambda,
    },
}

impl ArrayOperation {
    pub fn name(&self) -> &'static str {
        match self {
            ArrayOperation::Map { .. } => "map",
            ArrayOperation::Filter { .. } => "filter",
            ArrayOperation::Reduce { .. } => "reduce",
            ArrayOperation::Slice { .. } => "slice",
            ArrayOperation::FlatMap { .. } => "flatMap",
        }
    }

    pub fn array(&self) -> &Expression {
        match self {
            ArrayOperation::Map { array, .. }
            | ArrayOperation::Filter { array, .. }
            | ArrayOperation::Reduce { array, .. }
            | ArrayOperation::Slice { array, .. }
            | ArrayOperation::FlatMap { array, .. } => array,
        }
    }
}

// ----------------------------------------------------------------- Parsing

fn field_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn required<'v>(map: &'v Map<String, Value>, key: &str, path: &str) -> Result<&'v Value, ExprError> {
    map.get(key)
        .ok_or_else(|| ExprError::shape(path, format!("missing '{}'", key)))
}

fn optional_int(map: &Map<String, Value>, key: &str, path: &str) -> Result<Option<i64>, ExprError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| ExprError::shape(path, format!("slice {} must be an integer", key))),
    }
}

/// Parses `{param | params, body}`.
pub fn parse_lambda(raw: &Value, path: &str) -> Result<Lambda, ExprError> {
    let Value::Object(map) = raw else {
        return Err(ExprError::shape(path, "lambda must be a mapping"));
    };
    let params = match (map.get("param"), map.get("params")) {
        (Some(Value::String(name)), None) => {
            util::check_access(name)?;
            LambdaParams::Single(name.clone())
        }
        (None, Some(Value::Array(names))) => {
            let names = names
                .iter()
                .map(|name| match name.as_str() {
                    Some(name) => util::check_access(name).map(|_| name.to_string()),
                    None => Err(ExprError::shape(path, "lambda params must be strings")),
                })
                .collect::<Result<Vec<_>, _>>()?;
            LambdaParams::Multiple(names)
        }
        (Some(_), Some(_)) => {
            return Err(ExprError::shape(path, "lambda takes 'param' or 'params', not both"))
        }
        _ => return Err(ExprError::shape(path, "lambda requires 'param' or 'params'")),
    };
    let body = parse_expression(required(map, "body", path)?, &field_path(path, "body"))?;
    Ok(Lambda { params, body })
}

/// Parses a raw `{op, array, ...}` mapping.
pub fn parse_array_operation(raw: &Value, path: &str) -> Result<ArrayOperation, ExprError> {
    let Value::Object(map) = raw else {
        return Err(ExprError::shape(path, "array operation must be a mapping"));
    };
    let op = required(map, "op", path)?
        .as_str()
        .ok_or_else(|| ExprError::shape(path, "'op' must be a string"))?;
    if !ARRAY_OPERATIONS.contains(&op) {
        return Err(ExprError::unknown_array_operation(path, op));
    }
    let array = parse_expression(required(map, "array", path)?, &field_path(path, "array"))?;
    let lambda = |key: &str| parse_lambda(required(map, key, path)?, &field_path(path, key));

    let operation = match op {
        "map" => ArrayOperation::Map {
            array,
            transform: lambda("transform")?,
        },
        "filter" => ArrayOperation::Filter {
            array,
            predicate: lambda("predicate")?,
        },
        "reduce" => ArrayOperation::Reduce {
            array,
            reducer: lambda("reducer")?,
            initial: parse_expression(required(map, "initial", path)?, &field_path(path, "initial"))?,
        },
        "flatMap" => ArrayOperation::FlatMap {
            array,
            transform: lambda("transform")?,
        },
        _ => {
            let step = optional_int(map, "step", path)?;
            if step == Some(0) {
                return Err(ExprError::shape(path, "slice step cannot be zero"));
            }
            ArrayOperation::Slice {
                array,
                start: optional_int(map, "start", path)?.unwrap_or(0),
                end: optional_int(map, "end", path)?,
                step,
                path: path.to_string(),
            }
        }
    };
    Ok(operation)
}

// ----------------------------------------------------------------- Evaluation

pub fn evaluate_array_operation(op: &ArrayOperation, ctx: &ArrayEvalCtx<'_>) -> Result<JsValue, ExprError> {
    match op {
        ArrayOperation::Map { array, transform } => evaluate_map_operation(array, transform, ctx),
        ArrayOperation::Filter { array, predicate } => evaluate_filter_operation(array, predicate, ctx),
        ArrayOperation::Reduce {
            array,
            reducer,
            initial,
        } => evaluate_reduce_operation(array, reducer, initial, ctx),
        ArrayOperation::Slice {
            array,
            start,
            end,
            step,
            path,
        } => evaluate_slice_operation(array, *start, *end, *step, path, ctx),
        ArrayOperation::FlatMap { array, transform } => evaluate_flat_map_operation(array, transform, ctx),
    }
}

/// Evaluates `expr` and insists on an array.
pub fn get_array_from_expression(
    expr: &Expression,
    ctx: &ArrayEvalCtx<'_>,
    op_name: &str,
) -> Result<Vec<JsValue>, ExprError> {
    match ctx.evaluate_expression(expr)? {
        JsValue::Array(items) => Ok(items),
        other => Err(ExprError::type_error(format!(
            "Expected array for {} operation, got {}",
            op_name,
            other.type_name()
        ))),
    }
}

/// Binds `args` to the lambda's parameters in a child scope and evaluates
/// the body there. Missing arguments bind as `undefined`.
pub fn evaluate_lambda(lambda: &Lambda, args: &[JsValue], ctx: &ArrayEvalCtx<'_>) -> Result<JsValue, ExprError> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    let bindings: Vec<(String, JsValue)> = match &lambda.params {
        LambdaParams::Single(name) => vec![(name.clone(), arg(0))],
        LambdaParams::Multiple(names) => names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), arg(i)))
            .collect(),
    };
    let child = ctx.scope.child(bindings);
    ctx.evaluator.evaluate_expression(&lambda.body, &child)
}

/// Leading arguments plus the whole array, the latter only when the lambda
/// names a parameter for it.
fn lambda_args(lambda: &Lambda, mut leading: Vec<JsValue>, array: &[JsValue]) -> Vec<JsValue> {
    if lambda.param_count() > leading.len() {
        leading.push(JsValue::Array(array.to_vec()));
    }
    leading
}

pub fn evaluate_map_operation(
    array: &Expression,
    transform: &Lambda,
    ctx: &ArrayEvalCtx<'_>,
) -> Result<JsValue, ExprError> {
    let items = get_array_from_expression(array, ctx, "map")?;
    tracing::trace!(op = "map", len = items.len(), "array operation");
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let args = lambda_args(transform, vec![item.clone(), JsValue::from(i)], &items);
        out.push(evaluate_lambda(transform, &args, ctx)?);
    }
    Ok(JsValue::Array(out))
}

pub fn evaluate_filter_operation(
    array: &Expression,
    predicate: &Lambda,
    ctx: &ArrayEvalCtx<'_>,
) -> Result<JsValue, ExprError> {
    let items = get_array_from_expression(array, ctx, "filter")?;
    tracing::trace!(op = "filter", len = items.len(), "array operation");
    let mut out = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let args = lambda_args(predicate, vec![item.clone(), JsValue::from(i)], &items);
        if util::is_truthy(&evaluate_lambda(predicate, &args, ctx)?) {
            out.push(item.clone());
        }
    }
    Ok(JsValue::Array(out))
}

pub fn evaluate_reduce_operation(
    array: &Expression,
    reducer: &Lambda,
    initial: &Expression,
    ctx: &ArrayEvalCtx<'_>,
) -> Result<JsValue, ExprError> {
    let items = get_array_from_expression(array, ctx, "reduce")?;
    tracing::trace!(op = "reduce", len = items.len(), "array operation");
    let mut acc = ctx.evaluate_expression(initial)?;
    for (i, item) in items.iter().enumerate() {
        let args = lambda_args(reducer, vec![acc, item.clone(), JsValue::from(i)], &items);
        acc = evaluate_lambda(reducer, &args, ctx)?;
    }
    Ok(acc)
}

/// `start`/`end` count from the end when negative. A positive step walks
/// forward while `i < end`; a negative step walks backward while `i > end`,
/// down to index 0 when `end` is absent.
pub fn evaluate_slice_operation(
    array: &Expression,
    start: i64,
    end: Option<i64>,
    step: Option<i64>,
    path: &str,
    ctx: &ArrayEvalCtx<'_>,
) -> Result<JsValue, ExprError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(ExprError::shape(path, "slice step cannot be zero"));
    }
    let items = get_array_from_expression(array, ctx, "slice")?;
    tracing::trace!(op = "slice", len = items.len(), start, ?end, step, "array operation");

    let len = items.len() as i64;
    let normalize = |v: i64| if v < 0 { (len + v).max(0) } else { v };
    let mut out = Vec::new();
    if step > 0 {
        let end = end.map_or(len, normalize).min(len);
        let mut i = normalize(start);
        while i < end {
            out.push(items[i as usize].clone());
            i = match i.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }
    } else {
        let end = end.map_or(-1, normalize);
        let mut i = normalize(start).min(len - 1);
        while i > end && i >= 0 {
            out.push(items[i as usize].clone());
            i = match i.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }
    }
    Ok(JsValue::Array(out))
}

/// Like map, but array results are spliced in one level deep.
pub fn evaluate_flat_map_operation(
    array: &Expression,
    transform: &Lambda,
    ctx: &ArrayEvalCtx<'_>,
) -> Result<JsValue, ExprError> {
    let items = get_array_from_expression(array, ctx, "flatMap")?;
    tracing::trace!(op = "flatMap", len = items.len(), "array operation");
    let mut out = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let args = lambda_args(transform, vec![item.clone(), JsValue::from(i)], &items);
        match evaluate_lambda(transform, &args, ctx)? {
            JsValue::Array(inner) => out.extend(inner),
            other => out.push(other),
        }
    }
    Ok(JsValue::Array(out))
}
