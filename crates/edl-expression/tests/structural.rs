//! Structural expressions parsed from document values and evaluated against
//! a scope.

use edl_expression::{
    parse_expression, DocumentEvaluator, ErrorKind, ExprError, Expression, JsValue, Scope,
};
use serde_json::{json, Value};

fn check(raw: Value, expected: Value, data: Value) {
    let expr = parse_expression(&raw, "field")
        .unwrap_or_else(|e| panic!("parse({}) failed: {}", raw, e));
    let scope = Scope::from_json(data);
    let value = DocumentEvaluator::new()
        .evaluate(&expr, &scope)
        .unwrap_or_else(|e| panic!("evaluate({}) failed: {}", raw, e));
    assert_eq!(value, JsValue::from(expected), "expression: {}", raw);
}

fn check_err(raw: Value, data: Value) -> ExprError {
    let expr = match parse_expression(&raw, "field") {
        Ok(expr) => expr,
        Err(err) => return err,
    };
    let scope = Scope::from_json(data);
    DocumentEvaluator::new()
        .evaluate(&expr, &scope)
        .expect_err("expected evaluation to fail")
}

// ----------------------------------------------------------------- Scalars & paths

#[test]
fn test_scalars() {
    check(json!(42), json!(42), json!({}));
    check(json!("plain text"), json!("plain text"), json!({}));
    check(json!(null), json!(null), json!({}));
    check(json!([1, "$a", [true]]), json!([1, 5, [true]]), json!({"a": 5}));
}

#[test]
fn test_paths() {
    let data = json!({
        "order": {"items": [{"sku": "A1"}, {"sku": "B2"}], "id": 7},
        "empty": null
    });
    check(json!("$order.id"), json!(7), data.clone());
    check(json!("$order.items[1].sku"), json!("B2"), data.clone());
    check(json!({"path": "order.items.0.sku"}), json!("A1"), data.clone());
    check(json!({"path": "$order.id"}), json!(7), data.clone());
    check(json!("$empty.anything"), json!(null), json!({"empty": {"anything": null}}));

    let expr = parse_expression(&json!("$missing.deep.path"), "").unwrap();
    let value = DocumentEvaluator::new()
        .evaluate(&expr, &Scope::from_json(data))
        .unwrap();
    assert_eq!(value, JsValue::Undefined);
}

#[test]
fn test_path_sandbox() {
    let err = check_err(json!("$order.constructor"), json!({"order": {}}));
    assert_eq!(err.kind(), ErrorKind::SandboxViolation);
    let err = check_err(json!("$__proto__"), json!({}));
    assert_eq!(err.kind(), ErrorKind::SandboxViolation);
}

#[test]
fn test_literal_escape() {
    check(json!({"literal": "$not.a.path"}), json!("$not.a.path"), json!({}));
    check(json!({"literal": {"op": "+", "left": 1, "right": 2}}), json!({"op": "+", "left": 1, "right": 2}), json!({}));
}

// ----------------------------------------------------------------- Templates

#[test]
fn test_templates() {
    let data = json!({"symbol": "BTC", "qty": 2, "user": {"name": "Ann"}, "nothing": null});
    check(json!("{{ $symbol }}/USD"), json!("BTC/USD"), data.clone());
    check(json!("{{$qty}} x {{ $symbol }}"), json!("2 x BTC"), data.clone());
    check(json!("Hi {{ user.name }}!"), json!("Hi Ann!"), data.clone());
    check(json!("[{{ $nothing }}]"), json!("[]"), data.clone());
    check(json!("[{{ $absent }}]"), json!("[]"), data);
}

// ----------------------------------------------------------------- Operators

#[test]
fn test_binary_and_unary() {
    let data = json!({"price": 10, "qty": 3, "side": "buy", "flag": false});
    check(json!({"op": "*", "left": "$price", "right": "$qty"}), json!(30), data.clone());
    check(
        json!({"op": "+", "left": {"op": "*", "left": "$price", "right": 2}, "right": 1}),
        json!(21),
        data.clone(),
    );
    check(json!({"op": "===", "left": "$side", "right": "buy"}), json!(true), data.clone());
    check(json!({"op": "!==", "left": "$side", "right": "buy"}), json!(false), data.clone());
    check(json!({"op": "==", "left": 1, "right": "1"}), json!(false), data.clone());
    check(json!({"op": "+", "left": "$side", "right": "-1"}), json!("buy-1"), data.clone());
    check(json!({"op": "!", "operand": "$flag"}), json!(true), data.clone());
    check(json!({"op": "-", "operand": "$price"}), json!(-10), data.clone());
    check(json!({"op": "??", "left": "$missing", "right": "fallback"}), json!("fallback"), data);
}

#[test]
fn test_unknown_operator_carries_path() {
    let err = parse_expression(&json!({"op": "**", "left": 1, "right": 2}), "fields.total").unwrap_err();
    assert_eq!(err.to_string(), "fields.total: Unknown operator: **");
    let err = parse_expression(&json!({"op": "~", "operand": 1}), "").unwrap_err();
    assert_eq!(err.to_string(), "<root>: Unknown operator: ~");
}

// ----------------------------------------------------------------- Calls

#[test]
fn test_calls() {
    let data = json!({"name": "  btc  ", "values": [3, 1, 2]});
    check(
        json!({"call": "toUpperCase", "args": [{"call": "trim", "args": ["$name"]}]}),
        json!("BTC"),
        data.clone(),
    );
    check(json!({"call": "max", "args": [1, 9, 4]}), json!(9), data.clone());
    check(json!({"call": "sort", "args": ["$values"]}), json!([1, 2, 3]), data);
}

#[test]
fn test_registered_and_unknown_functions() {
    let mut evaluator = DocumentEvaluator::new();
    evaluator
        .register_function("nonce", |_| Ok(JsValue::from(1234.0)))
        .unwrap();
    assert!(matches!(
        evaluator.register_function("trim", |_| Ok(JsValue::Null)),
        Err(ExprError::BuiltinOverride(_))
    ));

    let scope = Scope::new();
    let expr = parse_expression(&json!({"call": "nonce"}), "headers.nonce").unwrap();
    assert_eq!(evaluator.evaluate(&expr, &scope).unwrap(), JsValue::from(1234.0));

    let expr = parse_expression(&json!({"call": "hmac", "args": ["x"]}), "").unwrap();
    let err = evaluator.evaluate(&expr, &scope).unwrap_err();
    assert_eq!(err, ExprError::UnknownFunction("hmac".into()));
    assert_eq!(err.to_string(), "Unknown function: hmac");
}

#[test]
fn test_call_shape_errors() {
    let err = parse_expression(&json!({"call": "f", "args": "x"}), "a").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Shape);
    let err = parse_expression(&json!({"call": 5}), "a").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Shape);
}

// ----------------------------------------------------------------- Control flow

#[test]
fn test_conditional() {
    let raw = json!({"if": {"op": ">", "left": "$qty", "right": 0}, "then": "buy", "else": "sell"});
    check(raw.clone(), json!("buy"), json!({"qty": 1}));
    check(raw, json!("sell"), json!({"qty": -1}));

    let expr = parse_expression(&json!({"if": "$flag", "then": 1}), "").unwrap();
    let value = DocumentEvaluator::new()
        .evaluate(&expr, &Scope::from_json(json!({"flag": false})))
        .unwrap();
    assert_eq!(value, JsValue::Undefined);
}

#[test]
fn test_switch() {
    let raw = json!({
        "switch": "$side",
        "cases": {"buy": "BID", "sell": "ASK"},
        "default": "UNKNOWN"
    });
    check(raw.clone(), json!("BID"), json!({"side": "buy"}));
    check(raw.clone(), json!("ASK"), json!({"side": "sell"}));
    check(raw, json!("UNKNOWN"), json!({"side": "hold"}));
    check(
        json!({"switch": "$code", "cases": {"1": "one"}}),
        json!("one"),
        json!({"code": 1}),
    );
}

#[test]
fn test_coalesce_list() {
    check(json!({"coalesce": ["$a", "$b", "none"]}), json!(2), json!({"a": null, "b": 2}));
    check(json!({"coalesce": ["$a", "$b"]}), json!(null), json!({"a": null, "b": null}));
    check(json!({"coalesce": [0, 1]}), json!(0), json!({}));
}

#[test]
fn test_object_of_expressions() {
    check(
        json!({
            "symbol": "{{ $base }}{{ $quote }}",
            "amount": {"op": "*", "left": "$qty", "right": 100},
            "meta": {"static": true}
        }),
        json!({"symbol": "BTCUSD", "amount": 250, "meta": {"static": true}}),
        json!({"base": "BTC", "quote": "USD", "qty": 2.5}),
    );
}

// ----------------------------------------------------------------- Properties

#[test]
fn test_parse_is_idempotent() {
    let raw = json!({
        "if": {"op": "&&", "left": "$a", "right": {"op": "!", "operand": "$b"}},
        "then": "{{ $x }}-{{ $y }}",
        "else": {"op": "map", "array": "$xs", "transform": {"param": "v", "body": "$v.id"}}
    });
    let first: Expression = parse_expression(&raw, "doc").unwrap();
    let second = parse_expression(&raw, "doc").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_scope_is_not_mutated() {
    let scope = Scope::from_json(json!({"xs": [1, 2], "v": "outer"}));
    let expr = parse_expression(
        &json!({"op": "map", "array": "$xs", "transform": {"param": "v", "body": "$v"}}),
        "",
    )
    .unwrap();
    let value = DocumentEvaluator::new().evaluate(&expr, &scope).unwrap();
    assert_eq!(value, JsValue::from(json!([1, 2])));
    assert_eq!(scope.get("v"), Some(&JsValue::from("outer")));
}
