//! Recursive-descent parser for string expressions.
//!
//! Precedence, loosest first:
//!
//! ```text
//! ternary      a ? b : c            (right-associative)
//! coalesce     a ?? b
//! or           a || b
//! and          a && b
//! equality     a == b, a != b
//! relational   a < b, a > b, a <= b, a >= b
//! additive     a + b, a - b
//! mult.        a * b, a / b, a % b
//! unary        !a, -a
//! postfix      a.b, a[b], f(x), a.f(x)
//! primary      literals, identifiers, ( expr )
//! ```
//!
//! Every binary tier is left-associative. `a.f(x)` is sugar for `f(a, x)`,
//! which keeps calls name-based while allowing chains such as `a.b[0].c()`.

use crate::ast::{BinaryOp, Node, UnaryOp};
use crate::error::ExprError;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::types::JsValue;

/// Nesting limit used when no evaluator options are involved.
pub const DEFAULT_MAX_NESTING: usize = 256;

static EOF: TokenKind = TokenKind::Eof;

const LOOSEST: u8 = 1;

fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Coalesce => 1,
        BinaryOp::Or => 2,
        BinaryOp::And => 3,
        BinaryOp::Eq | BinaryOp::NotEq => 4,
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => 5,
        BinaryOp::Add | BinaryOp::Sub => 6,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 7,
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    /// Parses a token stream produced by [`Lexer::tokenize`].
    pub fn parse(tokens: Vec<Token>) -> Result<Node, ExprError> {
        Self::parse_with_limit(tokens, DEFAULT_MAX_NESTING)
    }

    /// Like [`Parser::parse`], failing with [`ExprError::DepthExceeded`] once
    /// sub-expressions nest deeper than `max_depth`.
    pub fn parse_with_limit(tokens: Vec<Token>, max_depth: usize) -> Result<Node, ExprError> {
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        };
        let node = parser.parse_expression()?;
        if *parser.current() != TokenKind::Eof {
            return Err(parser.unexpected("after end of expression"));
        }
        Ok(node)
    }

    pub fn parse_str(input: &str) -> Result<Node, ExprError> {
        Self::parse(Lexer::tokenize(input)?)
    }

    fn parse_expression(&mut self) -> Result<Node, ExprError> {
        self.enter()?;
        let node = self.parse_ternary();
        self.depth -= 1;
        node
    }

    fn parse_ternary(&mut self) -> Result<Node, ExprError> {
        let test = self.parse_binary(LOOSEST)?;
        if *self.current() != TokenKind::Question {
            return Ok(test);
        }
        self.advance();
        let consequent = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let alternate = self.parse_expression()?;
        Ok(Node::conditional(test, consequent, alternate))
    }

    /// Precedence climbing over the binary tiers. Operators of equal
    /// precedence fold left in the loop; only tighter tiers recurse.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Node, ExprError> {
        let mut left = self.parse_unary()?;
        let mut folds = 0;
        while let Some(op) = self.current_binary_op() {
            let precedence = precedence(op);
            if precedence < min_precedence {
                break;
            }
            self.advance();
            // Each fold deepens the tree by one level.
            self.enter()?;
            folds += 1;
            let right = self.parse_binary(precedence + 1)?;
            left = Node::binary(op, left, right);
        }
        self.depth -= folds;
        Ok(left)
    }

    fn current_binary_op(&self) -> Option<BinaryOp> {
        match self.current() {
            TokenKind::Operator(op) => BinaryOp::from_symbol(op),
            _ => None,
        }
    }

    fn parse_unary(&mut self) -> Result<Node, ExprError> {
        let op = match self.current() {
            TokenKind::Operator(symbol) => UnaryOp::from_symbol(symbol),
            _ => None,
        };
        let Some(op) = op else {
            return self.parse_postfix();
        };
        self.advance();
        self.enter()?;
        let operand = self.parse_unary();
        self.depth -= 1;
        Ok(Node::unary(op, operand?))
    }

    fn parse_postfix(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_primary()?;
        let mut links = 0;
        loop {
            if matches!(
                self.current(),
                TokenKind::Dot | TokenKind::LBracket | TokenKind::LParen
            ) {
                self.enter()?;
                links += 1;
            }
            match self.current() {
                TokenKind::Dot => {
                    self.advance();
                    let property = match self.current().clone() {
                        TokenKind::Identifier(name) => name,
                        _ => return Err(self.unexpected("after '.'")),
                    };
                    self.advance();
                    if *self.current() == TokenKind::LParen {
                        let mut args = vec![node];
                        args.extend(self.parse_arguments()?);
                        node = Node::call(property, args);
                    } else {
                        node = Node::member(node, property);
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket)?;
                    node = Node::index(node, index);
                }
                TokenKind::LParen => {
                    let Node::Identifier(name) = node else {
                        return Err(ExprError::syntax(
                            "Only named functions can be called",
                            self.position(),
                        ));
                    };
                    let args = self.parse_arguments()?;
                    node = Node::call(name, args);
                }
                _ => {
                    self.depth -= links;
                    return Ok(node);
                }
            }
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Node>, ExprError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if *self.current() == TokenKind::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            match self.current() {
                TokenKind::Comma => self.advance(),
                TokenKind::RParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => return Err(self.unexpected("in argument list")),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Node, ExprError> {
        let node = match self.current().clone() {
            TokenKind::Number(n) => Node::Literal(JsValue::Number(n)),
            TokenKind::String(s) => Node::Literal(JsValue::String(s)),
            TokenKind::Boolean(b) => Node::Literal(JsValue::Bool(b)),
            TokenKind::Null => Node::Literal(JsValue::Null),
            TokenKind::Undefined => Node::Literal(JsValue::Undefined),
            TokenKind::Identifier(name) => Node::Identifier(name),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                return Ok(inner);
            }
            _ => return Err(self.unexpected("")),
        };
        self.advance();
        Ok(node)
    }

    // ---------------------------------------------------------- Cursor helpers

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ExprError::DepthExceeded(self.max_depth));
        }
        Ok(())
    }

    fn current(&self) -> &TokenKind {
        self.tokens.get(self.pos).map(|t| &t.kind).unwrap_or(&EOF)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.position)
            .unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<(), ExprError> {
        if *self.current() == expected {
            self.advance();
            Ok(())
        } else {
            Err(ExprError::syntax(
                format!(
                    "Expected {} but got {}",
                    expected.describe(),
                    self.current().describe()
                ),
                self.position(),
            ))
        }
    }

    fn unexpected(&self, context: &str) -> ExprError {
        let mut message = format!("Unexpected token {}", self.current().describe());
        if !context.is_empty() {
            message.push(' ');
            message.push_str(context);
        }
        ExprError::syntax(message, self.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Node {
        Parser::parse_str(input).unwrap_or_else(|e| panic!("parse({}) failed: {}", input, e))
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        assert_eq!(
            parse("1 + 2 * 3"),
            Node::binary(
                BinaryOp::Add,
                Node::number(1.0),
                Node::binary(BinaryOp::Mul, Node::number(2.0), Node::number(3.0)),
            )
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(
            parse("10 - 4 - 3"),
            Node::binary(
                BinaryOp::Sub,
                Node::binary(BinaryOp::Sub, Node::number(10.0), Node::number(4.0)),
                Node::number(3.0),
            )
        );
    }

    #[test]
    fn test_ternary_right_associative() {
        assert_eq!(
            parse("a ? b : c ? d : e"),
            Node::conditional(
                Node::ident("a"),
                Node::ident("b"),
                Node::conditional(Node::ident("c"), Node::ident("d"), Node::ident("e")),
            )
        );
    }

    #[test]
    fn test_coalesce_is_looser_than_or() {
        assert_eq!(
            parse("a || b ?? c"),
            Node::binary(
                BinaryOp::Coalesce,
                Node::binary(BinaryOp::Or, Node::ident("a"), Node::ident("b")),
                Node::ident("c"),
            )
        );
    }

    #[test]
    fn test_unary_chain() {
        assert_eq!(
            parse("!-x"),
            Node::unary(UnaryOp::Not, Node::unary(UnaryOp::Neg, Node::ident("x")))
        );
    }

    #[test]
    fn test_postfix_chain() {
        assert_eq!(
            parse("a.b[0].c()"),
            Node::call(
                "c",
                vec![Node::index(Node::member(Node::ident("a"), "b"), Node::number(0.0))],
            )
        );
        assert_eq!(
            parse("max(1, x.y)"),
            Node::call(
                "max",
                vec![Node::number(1.0), Node::member(Node::ident("x"), "y")]
            )
        );
    }

    #[test]
    fn test_call_requires_identifier() {
        let err = Parser::parse_str("a[0](1)").unwrap_err();
        assert!(err.to_string().contains("Only named functions"), "got: {}", err);
    }

    #[test]
    fn test_expected_but_got() {
        let err = Parser::parse_str("(1 + 2").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected ')' but got end of input at position 6"
        );
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(Parser::parse_str("1 2").is_err());
        assert!(Parser::parse_str("a b").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        let tokens = Lexer::tokenize(&deep).unwrap();
        assert_eq!(
            Parser::parse_with_limit(tokens.clone(), 5).unwrap_err(),
            ExprError::DepthExceeded(5)
        );
        assert_eq!(Parser::parse(tokens).unwrap(), Node::number(1.0));
    }

    #[test]
    fn test_very_deep_input_does_not_overflow() {
        let deep = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(matches!(
            Parser::parse_str(&deep),
            Err(ExprError::DepthExceeded(_))
        ));
        let bangs = format!("{}true", "!".repeat(100_000));
        assert!(matches!(
            Parser::parse_str(&bangs),
            Err(ExprError::DepthExceeded(_))
        ));
    }

    #[test]
    fn test_long_chains_count_toward_nesting() {
        let sum = vec!["1"; 100_000].join(" + ");
        assert!(matches!(
            Parser::parse_str(&sum),
            Err(ExprError::DepthExceeded(_))
        ));
        let path = format!("a{}", ".b".repeat(100_000));
        assert!(matches!(
            Parser::parse_str(&path),
            Err(ExprError::DepthExceeded(_))
        ));
        assert!(Parser::parse_str(&vec!["1"; 50].join(" + ")).is_ok());
    }
}
