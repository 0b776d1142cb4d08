use edl_expression::{parse_expression, JsValue, SafeEvaluator};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn arith_op() -> impl Strategy<Value = (&'static str, fn(f64, f64) -> f64)> {
    prop_oneof![
        Just(("+", (|a, b| a + b) as fn(f64, f64) -> f64)),
        Just(("-", (|a, b| a - b) as fn(f64, f64) -> f64)),
        Just(("*", (|a, b| a * b) as fn(f64, f64) -> f64)),
    ]
}

fn counting_evaluator(calls: &Arc<AtomicUsize>) -> SafeEvaluator {
    let mut evaluator = SafeEvaluator::new();
    let counter = Arc::clone(calls);
    evaluator
        .register_function("touch", move |args| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(args.first().cloned().unwrap_or_default())
        })
        .unwrap();
    evaluator
}

fn shorthand() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z]{1,6}".prop_map(|s| json!(format!("${}", s))),
        "[a-z]{0,4}".prop_map(|s| json!(format!("pre {{{{ ${} }}}} post", s))),
        any::<bool>().prop_map(|b| json!(b)),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| json!({"op": "+", "left": l, "right": r})),
            inner.clone().prop_map(|o| json!({"op": "!", "operand": o})),
            (inner.clone(), inner.clone()).prop_map(|(t, e)| json!({"if": true, "then": t, "else": e})),
            prop::collection::vec(inner.clone(), 0..3).prop_map(|args| json!({"call": "max", "args": args})),
            prop::collection::vec(inner, 1..3).prop_map(Value::Array),
        ]
    })
}

proptest! {
    #[test]
    fn arithmetic_matches_f64(a in -1000i32..1000, b in -1000i32..1000, (symbol, f) in arith_op()) {
        let expression = format!("({}) {} ({})", a, symbol, b);
        let value = SafeEvaluator::new().try_evaluate(&expression).unwrap();
        prop_assert_eq!(value, JsValue::from(f(a as f64, b as f64)));
    }

    #[test]
    fn and_or_always_evaluate_both_sides(left in any::<bool>(), right in any::<bool>(), use_and in any::<bool>()) {
        let calls = Arc::new(AtomicUsize::new(0));
        let evaluator = counting_evaluator(&calls);
        let op = if use_and { "&&" } else { "||" };
        let expression = format!("touch({}) {} touch({})", left, op, right);
        let value = evaluator.try_evaluate(&expression).unwrap();
        prop_assert_eq!(calls.load(Ordering::SeqCst), 2);
        let expected = if use_and { left && right } else { left || right };
        prop_assert_eq!(value, JsValue::Bool(expected));
    }

    #[test]
    fn coalesce_skips_right_side_when_left_is_present(n in any::<i32>()) {
        let calls = Arc::new(AtomicUsize::new(0));
        let evaluator = counting_evaluator(&calls);
        let value = evaluator.try_evaluate(&format!("{} ?? touch(1)", n)).unwrap();
        prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
        prop_assert_eq!(value, JsValue::from(n as f64));
    }

    #[test]
    fn structural_parse_is_deterministic(raw in shorthand()) {
        let first = parse_expression(&raw, "p");
        let second = parse_expression(&raw, "p");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn evaluate_never_panics(input in "[a-z0-9 +*/%()!?:.<>=&|'\\[\\]-]{0,40}") {
        let result = SafeEvaluator::new().evaluate(&input);
        prop_assert!(result.is_ok() || result.error.is_some());
    }
}
