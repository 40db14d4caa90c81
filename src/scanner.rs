//! Module `scanner` implements a one‑pass, streaming lexer for the Lox language.
//!
//! It transforms a source string into a sequence of [`Token`]s, skipping
//! whitespace and comments, and emitting exactly one `EOF` token at the end.
//! Designed as a `FusedIterator`, it can be chained safely with other iterator
//! adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &str) -> Scanner<'_>`
//! - `impl Iterator for Scanner<'_>` yielding `Result<Token, LoxError>`.
//!   Lexical errors are yielded in place and scanning continues afterwards,
//!   so a single pass reports every bad character.
//!
//! # Recognised lexemes
//!
//! - Single‑character tokens: `(`, `)`, `{`, `}`, `,`, `.`, `-`, `+`, `;`, `*`, `/`.
//! - Two‑character operators: `!=`, `==`, `<=`, `>=`.
//! - String literals: `"` … `"`, possibly spanning lines.
//! - Numeric literals: integer and optional fractional part.
//! - Identifiers/keywords: alphanumeric/_ sequences, resolved via a
//!   perfect‑hash `KEYWORDS` map.
//! - `//` comments, skipped in bulk with `memchr`.
//!
//! # Example
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! let scanner = Scanner::new("print 123; // example");
//! let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();
//! assert_eq!(tokens.len(), 4);
//! ```

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// A single pass **scanner / lexer** over a borrowed source string.
pub struct Scanner<'a> {
    text: &'a str,              // entire source, for lexeme slicing
    src: &'a [u8],              // the same source viewed as bytes
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1‑based line counter (\n increments)
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `text`.
    #[inline]
    pub fn new(text: &'a str) -> Self {
        info!("Scanner created over {} bytes", text.len());

        Self {
            text,
            src: text.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  Callers guard with [`Self::is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Current byte, or `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.src[self.curr + 1]
        }
    }

    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Source text of the current lexeme.
    ///
    /// `start` and `curr` always sit on character boundaries: multi‑byte
    /// sequences are only ever consumed whole.
    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        &self.text[self.start..self.curr]
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* lexeme starting at `self.curr`.  A real token leaves its
    /// kind in `self.pending`; whitespace and comments leave it `None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        let tt = match b {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' if self.match_byte(b'=') => TokenType::BANG_EQUAL,
            b'!' => TokenType::BANG,
            b'=' if self.match_byte(b'=') => TokenType::EQUAL_EQUAL,
            b'=' => TokenType::EQUAL,
            b'<' if self.match_byte(b'=') => TokenType::LESS_EQUAL,
            b'<' => TokenType::LESS,
            b'>' if self.match_byte(b'=') => TokenType::GREATER_EQUAL,
            b'>' => TokenType::GREATER,

            b' ' | b'\r' | b'\t' => return Ok(()),

            b'\n' => {
                self.line += 1;

                return Ok(());
            }

            b'/' if self.match_byte(b'/') => {
                match memchr(b'\n', &self.src[self.curr..]) {
                    Some(pos) => self.curr += pos,
                    None => self.curr = self.len(),
                }

                return Ok(());
            }
            b'/' => TokenType::SLASH,

            b'"' => return self.parse_string(),

            b'0'..=b'9' => self.parse_number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.parse_identifier(),

            _ => {
                // Swallow the rest of a multi‑byte character.
                while self.peek() & 0xC0 == 0x80 {
                    self.advance();
                }

                let bad = self.lexeme();

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", bad),
                ));
            }
        };

        self.pending = Some(tt);

        Ok(())
    }

    /// Parse a double‑quoted string literal.  `self.start` points at the
    /// opening `"`; on success `self.curr` is past the closing one.
    fn parse_string(&mut self) -> Result<()> {
        let opening_line = self.line;

        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            debug!("String opened on line {} never closed", opening_line);

            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.advance(); // closing quote

        let contents = &self.text[self.start + 1..self.curr - 1];
        self.pending = Some(TokenType::STRING(contents.to_owned()));

        Ok(())
    }

    fn parse_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // Only ASCII digits and one dot were consumed, so this cannot fail.
        let n: f64 = self.lexeme().parse::<f64>().unwrap_or(0.0);

        TokenType::NUMBER(n)
    }

    fn parse_identifier(&mut self) -> TokenType {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        KEYWORDS
            .get(self.lexeme().as_bytes())
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            // Emit exactly one EOF, then terminate.
            if self.curr == self.len() {
                self.curr += 1;
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            self.start = self.curr;
            self.pending = None;

            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            if let Some(tt) = self.pending.take() {
                debug!("Scanned token ({:?}) on line {}", tt, self.line);

                return Some(Ok(Token::new(tt, self.lexeme(), self.line)));
            }
            // Whitespace or comment: keep going.
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

/// Scan `source` completely, separating good tokens from lexical errors.
///
/// The token list always ends with `EOF`, so it can be handed to the parser
/// even when errors were reported.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LoxError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for item in Scanner::new(source) {
        match item {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    info!(
        "Tokenized {} token(s) with {} error(s)",
        tokens.len(),
        errors.len()
    );

    (tokens, errors)
}
