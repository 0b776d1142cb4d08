//! Structural expressions: YAML shorthand parsed into a typed tree.
//!
//! | Shape | Expression |
//! |---|---|
//! | `null`, numbers, booleans | [`Expression::Literal`] |
//! | `"$a.b"` | [`Expression::Path`] |
//! | `"fee: {{ $fee }}"` | [`Expression::Template`] |
//! | sequences | [`Expression::Array`] |
//! | `{op, left, right}` | [`Expression::Binary`] |
//! | `{op, operand}` | [`Expression::Unary`] |
//! | `{call, args?}` | [`Expression::Call`] |
//! | `{if, then, else?}` | [`Expression::Conditional`] |
//! | `{path}` | [`Expression::Path`] |
//! | `{literal}` | [`Expression::Literal`] |
//! | `{switch, cases, default?}` | [`Expression::Switch`] |
//! | `{coalesce: [..]}` | [`Expression::Coalesce`] |
//! | `{op: map, array, ..}` | [`Expression::ArrayOp`] |
//! | any other mapping | [`Expression::Object`] |
//!
//! Parsing is pure: the same input always yields an equal tree.

use crate::array_ops::{parse_array_operation, ArrayOperation, ARRAY_OPERATIONS};
use crate::ast::{BinaryOp, UnaryOp};
use crate::error::ExprError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expr(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Path(String),
    Template(Vec<TemplatePart>),
    Array(Vec<Expression>),
    Object(BTreeMap<String, Expression>),
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Call {
        function: String,
        args: Vec<Expression>,
    },
    Conditional {
        condition: Box<Expression>,
        then: Box<Expression>,
        otherwise: Option<Box<Expression>>,
    },
    Switch {
        subject: Box<Expression>,
        cases: BTreeMap<String, Expression>,
        default: Option<Box<Expression>>,
    },
    Coalesce(Vec<Expression>),
    ArrayOp(Box<ArrayOperation>),
}

impl Expression {
    pub fn path(path: impl Into<String>) -> Self {
        Expression::Path(path.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }
}

/// Parses a raw document value. `context_path` names the value's location in
/// the document and prefixes every error.
pub fn parse_expression(raw: &Value, context_path: &str) -> Result<Expression, ExprError> {
    match raw {
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(Expression::Literal(raw.clone())),
        Value::String(s) => parse_string(s, context_path),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_expression(item, &format!("{}[{}]", context_path, i)))
            .collect::<Result<Vec<_>, _>>()
            .map(Expression::Array),
        Value::Object(map) => parse_mapping(map, context_path),
    }
}

fn parse_string(s: &str, path: &str) -> Result<Expression, ExprError> {
    if let Some(rest) = s.strip_prefix('$') {
        return Ok(Expression::Path(rest.to_string()));
    }
    if s.contains("{{") && s.contains("}}") {
        return parse_template(s, path);
    }
    Ok(Expression::Literal(Value::String(s.to_string())))
}

fn template_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").unwrap())
}

/// Splits `"a {{ $x }} b"` into text and expression parts. A span without a
/// leading `$` is read as a bare path.
fn parse_template(s: &str, path: &str) -> Result<Expression, ExprError> {
    let mut parts = Vec::new();
    let mut last = 0;
    for caps in template_regex().captures_iter(s) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            parts.push(TemplatePart::Text(s[last..whole.start()].to_string()));
        }
        let inner = inner.as_str();
        let expr = if inner.starts_with('$') {
            parse_string(inner, path)?
        } else {
            Expression::Path(inner.to_string())
        };
        parts.push(TemplatePart::Expr(expr));
        last = whole.end();
    }
    if last < s.len() {
        parts.push(TemplatePart::Text(s[last..].to_string()));
    }
    Ok(Expression::Template(parts))
}

fn field_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn parse_field(map: &Map<String, Value>, key: &str, path: &str) -> Result<Expression, ExprError> {
    let raw = map.get(key).unwrap_or(&Value::Null);
    parse_expression(raw, &field_path(path, key))
}

fn expect_str<'v>(map: &'v Map<String, Value>, key: &str, path: &str) -> Result<&'v str, ExprError> {
    map.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ExprError::shape(path, format!("'{}' must be a string", key)))
}

fn parse_binary_op(symbol: &str, path: &str) -> Result<BinaryOp, ExprError> {
    let symbol = match symbol {
        "===" => "==",
        "!==" => "!=",
        other => other,
    };
    BinaryOp::from_symbol(symbol).ok_or_else(|| ExprError::unknown_operator(path, symbol))
}

fn parse_mapping(map: &Map<String, Value>, path: &str) -> Result<Expression, ExprError> {
    let has = |key: &str| map.contains_key(key);

    if has("op") && has("left") && has("right") {
        let op = parse_binary_op(expect_str(map, "op", path)?, path)?;
        return Ok(Expression::Binary {
            op,
            left: Box::new(parse_field(map, "left", path)?),
            right: Box::new(parse_field(map, "right", path)?),
        });
    }

    if has("op") && has("operand") {
        let symbol = expect_str(map, "op", path)?;
        let op = UnaryOp::from_symbol(symbol)
            .ok_or_else(|| ExprError::unknown_operator(path, symbol))?;
        return Ok(Expression::Unary {
            op,
            operand: Box::new(parse_field(map, "operand", path)?),
        });
    }

    if has("call") {
        let function = expect_str(map, "call", path)?.to_string();
        let args = match map.get("args") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => {
                let args_path = field_path(path, "args");
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| parse_expression(item, &format!("{}[{}]", args_path, i)))
                    .collect::<Result<Vec<_>, _>>()?
            }
            Some(_) => return Err(ExprError::shape(path, "'args' must be a sequence")),
        };
        return Ok(Expression::Call { function, args });
    }

    if has("if") && has("then") {
        let otherwise = if has("else") {
            Some(Box::new(parse_field(map, "else", path)?))
        } else {
            None
        };
        return Ok(Expression::Conditional {
            condition: Box::new(parse_field(map, "if", path)?),
            then: Box::new(parse_field(map, "then", path)?),
            otherwise,
        });
    }

    if map.len() == 1 {
        if let Some(raw) = map.get("path") {
            let target = raw
                .as_str()
                .ok_or_else(|| ExprError::shape(path, "'path' must be a string"))?;
            return Ok(Expression::Path(target.trim_start_matches('$').to_string()));
        }
        if let Some(raw) = map.get("literal") {
            return Ok(Expression::Literal(raw.clone()));
        }
    }

    if has("switch") && has("cases") {
        let cases_path = field_path(path, "cases");
        let Some(Value::Object(raw_cases)) = map.get("cases") else {
            return Err(ExprError::shape(path, "'cases' must be a mapping"));
        };
        let mut cases = BTreeMap::new();
        for (key, value) in raw_cases {
            cases.insert(key.clone(), parse_expression(value, &field_path(&cases_path, key))?);
        }
        let default = if has("default") {
            Some(Box::new(parse_field(map, "default", path)?))
        } else {
            None
        };
        return Ok(Expression::Switch {
            subject: Box::new(parse_field(map, "switch", path)?),
            cases,
            default,
        });
    }

    if let Some(raw) = map.get("coalesce") {
        let Value::Array(items) = raw else {
            return Err(ExprError::shape(path, "'coalesce' must be a sequence"));
        };
        let coalesce_path = field_path(path, "coalesce");
        let candidates = items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_expression(item, &format!("{}[{}]", coalesce_path, i)))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Expression::Coalesce(candidates));
    }

    let is_array_op = map
        .get("op")
        .and_then(Value::as_str)
        .is_some_and(|op| ARRAY_OPERATIONS.contains(&op));
    if is_array_op && has("array") {
        let raw = Value::Object(map.clone());
        return Ok(Expression::ArrayOp(Box::new(parse_array_operation(&raw, path)?)));
    }

    let mut fields = BTreeMap::new();
    for (key, value) in map {
        fields.insert(key.clone(), parse_expression(value, &field_path(path, key))?);
    }
    Ok(Expression::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: Value) -> Expression {
        parse_expression(&raw, "").unwrap_or_else(|e| panic!("parse({}) failed: {}", raw, e))
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse(json!(null)), Expression::literal(Value::Null));
        assert_eq!(parse(json!(1.5)), Expression::literal(1.5));
        assert_eq!(parse(json!(true)), Expression::literal(true));
        assert_eq!(parse(json!("plain")), Expression::literal("plain"));
        assert_eq!(parse(json!("$a.b")), Expression::path("a.b"));
        assert_eq!(parse(json!("only {{ one brace")), Expression::literal("only {{ one brace"));
    }

    #[test]
    fn test_template_order() {
        assert_eq!(
            parse(json!("{{$x}} units")),
            Expression::Template(vec![
                TemplatePart::Expr(Expression::path("x")),
                TemplatePart::Text(" units".into()),
            ])
        );
        assert_eq!(
            parse(json!("a{{ b.c }}d{{$e}}")),
            Expression::Template(vec![
                TemplatePart::Text("a".into()),
                TemplatePart::Expr(Expression::path("b.c")),
                TemplatePart::Text("d".into()),
                TemplatePart::Expr(Expression::path("e")),
            ])
        );
    }

    #[test]
    fn test_shape_priority() {
        // `op` with left/right wins over an `if` key.
        assert!(matches!(
            parse(json!({"op": "+", "left": 1, "right": 2, "if": true, "then": 1})),
            Expression::Binary { op: BinaryOp::Add, .. }
        ));
        assert_eq!(
            parse(json!({"path": "a.b"})),
            Expression::path("a.b")
        );
        // `path` alongside other keys is an ordinary field.
        assert!(matches!(
            parse(json!({"path": "a", "x": 1})),
            Expression::Object(_)
        ));
        assert_eq!(
            parse(json!({"literal": "$not.a.path"})),
            Expression::literal("$not.a.path")
        );
    }

    #[test]
    fn test_strict_equality_aliases() {
        assert!(matches!(
            parse(json!({"op": "===", "left": 1, "right": 1})),
            Expression::Binary { op: BinaryOp::Eq, .. }
        ));
        assert!(matches!(
            parse(json!({"op": "!==", "left": 1, "right": 1})),
            Expression::Binary { op: BinaryOp::NotEq, .. }
        ));
    }

    #[test]
    fn test_call_args_default_empty() {
        assert_eq!(
            parse(json!({"call": "now"})),
            Expression::Call {
                function: "now".into(),
                args: vec![]
            }
        );
    }

    #[test]
    fn test_errors_carry_path() {
        let err = parse_expression(&json!({"op": "^", "left": 1, "right": 2}), "auth.sign").unwrap_err();
        assert_eq!(err.to_string(), "auth.sign: Unknown operator: ^");
        let err = parse_expression(&json!({"call": "f", "args": 3}), "x").unwrap_err();
        assert_eq!(err.to_string(), "x: 'args' must be a sequence");
        let err = parse_expression(&json!([{"call": 1}]), "list").unwrap_err();
        assert_eq!(err.to_string(), "list[0]: 'call' must be a string");
    }
}
