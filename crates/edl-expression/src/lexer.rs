//! Tokenizer for string expressions.

use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    Undefined,
    Identifier(String),
    Operator(&'static str),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Question,
    Colon,
    Eof,
}

impl TokenKind {
    /// Short human-readable form used in parser diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::String(s) => format!("string \"{}\"", s),
            TokenKind::Boolean(b) => b.to_string(),
            TokenKind::Null => "null".to_string(),
            TokenKind::Undefined => "undefined".to_string(),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::Operator(op) => format!("'{}'", op),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Question => "'?'".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub position: usize,
}

const TWO_CHAR_OPERATORS: [&str; 7] = ["==", "!=", "<=", ">=", "&&", "||", "??"];

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Tokenizes `input`. The result always ends with an [`TokenKind::Eof`] token.
    pub fn tokenize(input: &'a str) -> Result<Vec<Token>, ExprError> {
        let mut lexer = Self { input, pos: 0 };
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ExprError> {
        self.skip_whitespace();
        let position = self.pos;
        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                position,
            });
        };

        let kind = if c.is_ascii_digit() {
            self.read_number()?
        } else if c == '"' || c == '\'' {
            TokenKind::String(self.read_string()?)
        } else if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            self.read_word()
        } else if let Some(op) = self.peek_two_char_operator() {
            self.advance_by(2);
            TokenKind::Operator(op)
        } else {
            self.advance();
            match c {
                '+' => TokenKind::Operator("+"),
                '-' => TokenKind::Operator("-"),
                '*' => TokenKind::Operator("*"),
                '/' => TokenKind::Operator("/"),
                '%' => TokenKind::Operator("%"),
                '<' => TokenKind::Operator("<"),
                '>' => TokenKind::Operator(">"),
                '!' => TokenKind::Operator("!"),
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                '.' => TokenKind::Dot,
                ',' => TokenKind::Comma,
                '?' => TokenKind::Question,
                ':' => TokenKind::Colon,
                other => {
                    return Err(ExprError::syntax(
                        format!("Unexpected character '{}'", other),
                        position,
                    ))
                }
            }
        };

        Ok(Token { kind, position })
    }

    fn read_number(&mut self) -> Result<TokenKind, ExprError> {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| ExprError::syntax(format!("Invalid number '{}'", text), start))
    }

    fn read_string(&mut self) -> Result<String, ExprError> {
        let start = self.pos;
        let quote = self.peek().unwrap_or('"');
        self.advance();

        let mut result = String::new();
        loop {
            match self.peek() {
                None => return Err(ExprError::syntax("Unterminated string", start)),
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        None => return Err(ExprError::syntax("Unterminated string", start)),
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some(other) => result.push(other),
                    }
                    self.advance();
                }
                Some(c) => {
                    result.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_word(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                self.advance();
            } else {
                break;
            }
        }
        match &self.input[start..self.pos] {
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            word => TokenKind::Identifier(word.to_string()),
        }
    }

    fn peek_two_char_operator(&self) -> Option<&'static str> {
        TWO_CHAR_OPERATORS
            .iter()
            .copied()
            .find(|op| self.input[self.pos..].starts_with(op))
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }
}
