//! Expression engine for YAML exchange-definition documents.
//!
//! Two languages share one value model ([`JsValue`]) and one built-in
//! library:
//!
//! - **String expressions** such as `amount > 0 && side == "buy"`, run by the
//!   sandboxed [`SafeEvaluator`] with a depth ceiling and a wall-clock budget.
//! - **Structural expressions**: YAML shorthand (`$a.b`, `"{{ $x }} units"`,
//!   `{op, left, right}`, `{op: map, array, transform}`, ...) parsed by
//!   [`parse_expression`] and evaluated by a [`DocumentEvaluator`].
//!
//! # Example
//!
//! ```
//! use edl_expression::{parse_expression, DocumentEvaluator, JsValue, Scope};
//! use serde_json::json;
//!
//! let expr = parse_expression(
//!     &json!({
//!         "op": "map",
//!         "array": "$prices",
//!         "transform": {"param": "p", "body": {"op": "*", "left": "$p", "right": 2}}
//!     }),
//!     "fields.doubled",
//! )
//! .unwrap();
//!
//! let scope = Scope::from_json(json!({"prices": [1, 2, 3]}));
//! let value = DocumentEvaluator::new().evaluate(&expr, &scope).unwrap();
//! assert_eq!(value, JsValue::from(json!([2, 4, 6])));
//! ```

pub mod array_ops;
pub mod ast;
pub mod builtins;
pub mod error;
pub mod eval_ctx;
pub mod evaluate;
pub mod expression;
pub mod interpreter;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod scope;
pub mod types;
pub mod util;

pub use array_ops::{
    evaluate_array_operation, evaluate_filter_operation, evaluate_flat_map_operation,
    evaluate_lambda, evaluate_map_operation, evaluate_reduce_operation, evaluate_slice_operation,
    get_array_from_expression, parse_array_operation, parse_lambda, ArrayOperation, Lambda,
    LambdaParams,
};
pub use ast::{BinaryOp, Node, UnaryOp};
pub use error::{ErrorKind, ExprError};
pub use eval_ctx::{ArrayEvalCtx, ExpressionEvaluator};
pub use evaluate::DocumentEvaluator;
pub use expression::{parse_expression, Expression, TemplatePart};
pub use interpreter::{ExpressionResult, SafeEvaluator};
pub use lexer::{Lexer, Token, TokenKind};
pub use options::EvaluatorOptions;
pub use parser::Parser;
pub use scope::Scope;
pub use types::{Arity, BuiltinDefinition, Callable, JsValue};
