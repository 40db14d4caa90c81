use log::trace;
use serde::Serialize;
use std::fmt;
use std::mem;

/// Lexeme categories recognised by the scanner.
///
/// `STRING` and `NUMBER` carry their literal values; every other variant is a
/// punctuator, operator, keyword, `IDENTIFIER`, or the single `EOF` marker.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    // Single‑character punctuators.
    LEFT_PAREN,
    RIGHT_PAREN,
    LEFT_BRACE,
    RIGHT_BRACE,
    COMMA,
    DOT,
    MINUS,
    PLUS,
    SEMICOLON,
    SLASH,
    STAR,

    // One‑ or two‑character operators.
    BANG,
    BANG_EQUAL,
    EQUAL,
    EQUAL_EQUAL,
    GREATER,
    GREATER_EQUAL,
    LESS,
    LESS_EQUAL,

    // Literals.
    IDENTIFIER,

    /// String literal contents, without the surrounding quotes.
    STRING(String),

    #[serde(rename = "NUMBER")]
    NUMBER(f64),

    // Keywords.
    AND,
    CLASS,
    ELSE,
    FALSE,
    FUN,
    FOR,
    IF,
    NIL,
    OR,
    PRINT,
    RETURN,
    SUPER,
    THIS,
    TRUE,
    VAR,
    WHILE,

    EOF,
}

impl TokenType {
    /// Upper‑case variant name without any payload.
    pub fn name(&self) -> &'static str {
        match self {
            TokenType::LEFT_PAREN => "LEFT_PAREN",
            TokenType::RIGHT_PAREN => "RIGHT_PAREN",
            TokenType::LEFT_BRACE => "LEFT_BRACE",
            TokenType::RIGHT_BRACE => "RIGHT_BRACE",
            TokenType::COMMA => "COMMA",
            TokenType::DOT => "DOT",
            TokenType::MINUS => "MINUS",
            TokenType::PLUS => "PLUS",
            TokenType::SEMICOLON => "SEMICOLON",
            TokenType::SLASH => "SLASH",
            TokenType::STAR => "STAR",
            TokenType::BANG => "BANG",
            TokenType::BANG_EQUAL => "BANG_EQUAL",
            TokenType::EQUAL => "EQUAL",
            TokenType::EQUAL_EQUAL => "EQUAL_EQUAL",
            TokenType::GREATER => "GREATER",
            TokenType::GREATER_EQUAL => "GREATER_EQUAL",
            TokenType::LESS => "LESS",
            TokenType::LESS_EQUAL => "LESS_EQUAL",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::STRING(_) => "STRING",
            TokenType::NUMBER(_) => "NUMBER",
            TokenType::AND => "AND",
            TokenType::CLASS => "CLASS",
            TokenType::ELSE => "ELSE",
            TokenType::FALSE => "FALSE",
            TokenType::FUN => "FUN",
            TokenType::FOR => "FOR",
            TokenType::IF => "IF",
            TokenType::NIL => "NIL",
            TokenType::OR => "OR",
            TokenType::PRINT => "PRINT",
            TokenType::RETURN => "RETURN",
            TokenType::SUPER => "SUPER",
            TokenType::THIS => "THIS",
            TokenType::TRUE => "TRUE",
            TokenType::VAR => "VAR",
            TokenType::WHILE => "WHILE",
            TokenType::EOF => "EOF",
        }
    }
}

impl PartialEq for TokenType {
    /// Two TokenTypes are equal if they share the same variant
    /// (ignoring any inner data), so `NUMBER(0.0)` matches every number.
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// A scanned token: its category, the exact source text that produced it,
/// and the 1‑based line it was found on.
///
/// Tokens own their lexeme so the AST built from them can outlive the source
/// buffer (a REPL keeps closures from earlier lines alive).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn new<S: Into<String>>(token_type: TokenType, lexeme: S, line: usize) -> Self {
        let lexeme: String = lexeme.into();

        trace!(
            "Creating new token: type={:?}, lexeme={}, line={}",
            token_type,
            lexeme,
            line
        );

        Self {
            token_type,
            lexeme,
            line,
        }
    }

    /// Literal payload as printed by `tokenize`: `3.0`, `3.14`, the raw
    /// string, or `null` for tokens without a literal.
    pub fn literal(&self) -> String {
        match &self.token_type {
            TokenType::STRING(s) => s.clone(),
            TokenType::NUMBER(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                let mut buf = itoa::Buffer::new();
                format!("{}.0", buf.format(*n as i64))
            }
            TokenType::NUMBER(n) => n.to_string(),
            _ => "null".to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.token_type.name(),
            self.lexeme,
            self.literal()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_types_compare_by_variant_only() {
        assert_eq!(TokenType::NUMBER(1.0), TokenType::NUMBER(2.0));
        assert_eq!(
            TokenType::STRING("a".into()),
            TokenType::STRING("b".into())
        );
        assert_ne!(TokenType::LESS, TokenType::LESS_EQUAL);
    }

    #[test]
    fn display_uses_tokenize_format() {
        let number = Token::new(TokenType::NUMBER(3.0), "3", 1);
        let fraction = Token::new(TokenType::NUMBER(3.25), "3.25", 1);
        let string = Token::new(TokenType::STRING("hi".into()), "\"hi\"", 1);
        let keyword = Token::new(TokenType::CLASS, "class", 1);

        assert_eq!(number.to_string(), "NUMBER 3 3.0");
        assert_eq!(fraction.to_string(), "NUMBER 3.25 3.25");
        assert_eq!(string.to_string(), "STRING \"hi\" hi");
        assert_eq!(keyword.to_string(), "CLASS class null");
    }
}
